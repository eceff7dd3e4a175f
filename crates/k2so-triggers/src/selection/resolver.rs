//! Selection → command line
//!
//! Pure and deterministic: the same complete selection always yields the
//! same command string.

use std::fmt;

use super::catalog::{CommandCatalog, ResourceKind, TargetStyle};
use super::{ConversationSelection, SelectionError};

/// A resolved command line, ready for the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: String,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: args.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Everything after the program name, e.g. `logs web-1 -n prod`
    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn to_shell_string(&self) -> String {
        format!("{} {}", self.program, self.args)
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.args)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A pod must be picked from a listing of `namespace` first
    NeedPodList { namespace: String },
    /// A deployment must be picked from a listing of `namespace` first
    NeedDeploymentList { namespace: String },
    Ready(ShellCommand),
}

pub fn resolve(
    catalog: &CommandCatalog,
    selection: &ConversationSelection,
) -> Result<Resolution, SelectionError> {
    let command = selection
        .command
        .as_deref()
        .ok_or(SelectionError::Incomplete("command"))?;
    let sub_command = selection
        .sub_command
        .as_deref()
        .ok_or(SelectionError::Incomplete("sub-command"))?;
    let namespace = selection
        .namespace
        .as_deref()
        .ok_or(SelectionError::NamespaceNotSelected)?;

    let spec = catalog
        .command(command)
        .ok_or_else(|| SelectionError::UnknownCommand(command.to_string()))?;
    let sub_spec =
        catalog
            .sub_command(command, sub_command)
            .ok_or_else(|| SelectionError::InvalidSubCommand {
                command: command.to_string(),
                sub_command: sub_command.to_string(),
            })?;

    let args = match (sub_spec.resource, selection.resource_name.as_deref()) {
        (Some(ResourceKind::Pod), None) => {
            return Ok(Resolution::NeedPodList {
                namespace: namespace.to_string(),
            })
        }
        (Some(ResourceKind::Deployment), None) => {
            return Ok(Resolution::NeedDeploymentList {
                namespace: namespace.to_string(),
            })
        }
        (Some(kind), Some(name)) => match spec.target_style {
            TargetStyle::Bare => format!("{} {} -n {}", command, name, namespace),
            TargetStyle::Kinded => {
                format!("{} {} {} -n {}", command, kind.word(), name, namespace)
            }
        },
        (None, _) => format!("{} {} -n {}", command, sub_command, namespace),
    };

    Ok(Resolution::Ready(ShellCommand::new(catalog.program(), args)))
}
