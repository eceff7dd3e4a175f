//! Menu-driven command construction
//!
//! A conversation walks command → sub-command → namespace → (pod or
//! deployment) through a series of menu picks. Each pick is an event fed to
//! [`machine::transition`], a pure function over the current
//! [`ConversationFlow`]; the handler stores the result in the
//! [`SelectionStore`] and performs the returned effect.

pub mod catalog;
pub mod machine;
pub mod resolver;
pub mod store;

use thiserror::Error;

pub use catalog::{CommandCatalog, CommandSpec, ResourceKind, SubCommandSpec, TargetStyle};
pub use machine::{transition, Effect, FlowState, SelectionEvent, Transition};
pub use resolver::{resolve, Resolution, ShellCommand};
pub use store::SelectionStore;

/// Selection fields, in the only order they are meaningful
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SelectionField {
    Command,
    SubCommand,
    Namespace,
    ResourceName,
}

/// Accumulated menu choices for one conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSelection {
    pub command: Option<String>,
    pub sub_command: Option<String>,
    pub namespace: Option<String>,
    /// Pod or deployment name, depending on the command
    pub resource_name: Option<String>,
}

impl ConversationSelection {
    /// Set one field and clear every field after it
    pub fn set(&mut self, field: SelectionField, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            SelectionField::Command => {
                *self = Self {
                    command: value,
                    ..Self::default()
                };
            }
            SelectionField::SubCommand => {
                self.sub_command = value;
                self.namespace = None;
                self.resource_name = None;
            }
            SelectionField::Namespace => {
                self.namespace = value;
                self.resource_name = None;
            }
            SelectionField::ResourceName => {
                self.resource_name = value;
            }
        }
    }
}

/// Explicit flow state plus the selection accumulated so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationFlow {
    pub state: FlowState,
    pub selection: ConversationSelection,
}

impl Default for ConversationFlow {
    fn default() -> Self {
        Self {
            state: FlowState::AwaitingCommand,
            selection: ConversationSelection::default(),
        }
    }
}

/// A pick that cannot be applied; the message is shown to the user verbatim
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Namespace not selected. Please start over.")]
    NamespaceNotSelected,

    #[error("No {0} selected yet. Please start over.")]
    Incomplete(&'static str),

    #[error("Unknown command `{0}`. Please start over.")]
    UnknownCommand(String),

    #[error("`{sub_command}` is not available for `{command}`. Please pick again.")]
    InvalidSubCommand { command: String, sub_command: String },

    #[error("A {kind} doesn't fit the current selection. Please start over.")]
    OutOfOrder { kind: &'static str },
}

impl SelectionError {
    /// Text posted back to the conversation
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_selection() -> ConversationSelection {
        let mut selection = ConversationSelection::default();
        selection.set(SelectionField::Command, "describe");
        selection.set(SelectionField::SubCommand, "pods");
        selection.set(SelectionField::Namespace, "prod");
        selection.set(SelectionField::ResourceName, "web-1");
        selection
    }

    #[test]
    fn test_setting_command_resets_later_fields() {
        let mut selection = full_selection();
        selection.set(SelectionField::Command, "get");

        assert_eq!(selection.command.as_deref(), Some("get"));
        assert!(selection.sub_command.is_none());
        assert!(selection.namespace.is_none());
        assert!(selection.resource_name.is_none());
    }

    #[test]
    fn test_setting_namespace_clears_resource_only() {
        let mut selection = full_selection();
        selection.set(SelectionField::Namespace, "staging");

        assert_eq!(selection.sub_command.as_deref(), Some("pods"));
        assert_eq!(selection.namespace.as_deref(), Some("staging"));
        assert!(selection.resource_name.is_none());
    }

    #[test]
    fn test_namespace_error_text() {
        assert_eq!(
            SelectionError::NamespaceNotSelected.to_string(),
            "Namespace not selected. Please start over."
        );
    }
}
