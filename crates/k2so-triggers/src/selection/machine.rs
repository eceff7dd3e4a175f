//! Selection state machine
//!
//! `transition` is pure: it never touches the store, the cluster, or the
//! chat platform. It returns the next flow and the one effect the caller
//! should perform (show a menu or run a command).

use super::catalog::{CommandCatalog, ResourceKind};
use super::resolver::{resolve, Resolution, ShellCommand};
use super::{ConversationFlow, ConversationSelection, SelectionError, SelectionField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    AwaitingCommand,
    AwaitingSubCommand,
    AwaitingNamespace,
    AwaitingResource(ResourceKind),
    /// A command was produced; a new command pick starts over
    Resolved,
}

impl FlowState {
    /// The state a selection implies under `catalog`
    pub fn infer(catalog: &CommandCatalog, selection: &ConversationSelection) -> Self {
        if selection.command.is_none() {
            return Self::AwaitingCommand;
        }
        if selection.sub_command.is_none() {
            return Self::AwaitingSubCommand;
        }
        if selection.namespace.is_none() {
            return Self::AwaitingNamespace;
        }
        match resolve(catalog, selection) {
            Ok(Resolution::NeedPodList { .. }) => Self::AwaitingResource(ResourceKind::Pod),
            Ok(Resolution::NeedDeploymentList { .. }) => {
                Self::AwaitingResource(ResourceKind::Deployment)
            }
            Ok(Resolution::Ready(_)) => Self::Resolved,
            // Names the catalog doesn't know; only a fresh command pick helps
            Err(_) => Self::AwaitingCommand,
        }
    }
}

/// One menu pick, keyed by the menu it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    CommandChosen(String),
    SubCommandChosen(String),
    NamespaceChosen(String),
    PodChosen(String),
    DeploymentChosen(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    PromptSubCommands { command: String, options: Vec<String> },
    PromptNamespaces,
    PromptPods { namespace: String },
    PromptDeployments { namespace: String },
    Execute(ShellCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub flow: ConversationFlow,
    pub effect: Effect,
}

pub fn transition(
    catalog: &CommandCatalog,
    flow: &ConversationFlow,
    event: SelectionEvent,
) -> Result<Transition, SelectionError> {
    let mut selection = flow.selection.clone();

    match event {
        SelectionEvent::CommandChosen(command) => {
            if catalog.command(&command).is_none() {
                return Err(SelectionError::UnknownCommand(command));
            }
            let options = catalog.sub_command_names(&command);
            selection.set(SelectionField::Command, command.clone());
            Ok(Transition {
                flow: ConversationFlow {
                    state: FlowState::AwaitingSubCommand,
                    selection,
                },
                effect: Effect::PromptSubCommands { command, options },
            })
        }

        SelectionEvent::SubCommandChosen(sub_command) => {
            let command = selection
                .command
                .clone()
                .ok_or(SelectionError::Incomplete("command"))?;
            if catalog.sub_command(&command, &sub_command).is_none() {
                return Err(SelectionError::InvalidSubCommand {
                    command,
                    sub_command,
                });
            }
            selection.set(SelectionField::SubCommand, sub_command);
            Ok(Transition {
                flow: ConversationFlow {
                    state: FlowState::AwaitingNamespace,
                    selection,
                },
                effect: Effect::PromptNamespaces,
            })
        }

        SelectionEvent::NamespaceChosen(namespace) => {
            if selection.command.is_none() {
                return Err(SelectionError::Incomplete("command"));
            }
            if selection.sub_command.is_none() {
                return Err(SelectionError::Incomplete("sub-command"));
            }
            selection.set(SelectionField::Namespace, namespace);
            advance(catalog, selection)
        }

        SelectionEvent::PodChosen(name) => {
            choose_resource(catalog, selection, ResourceKind::Pod, name)
        }

        SelectionEvent::DeploymentChosen(name) => {
            choose_resource(catalog, selection, ResourceKind::Deployment, name)
        }
    }
}

fn choose_resource(
    catalog: &CommandCatalog,
    mut selection: ConversationSelection,
    kind: ResourceKind,
    name: String,
) -> Result<Transition, SelectionError> {
    if selection.namespace.is_none() {
        return Err(SelectionError::NamespaceNotSelected);
    }
    let expected = match (&selection.command, &selection.sub_command) {
        (Some(command), Some(sub_command)) => catalog
            .sub_command(command, sub_command)
            .and_then(|s| s.resource),
        _ => None,
    };
    if expected != Some(kind) {
        return Err(SelectionError::OutOfOrder { kind: kind.word() });
    }

    selection.set(SelectionField::ResourceName, name);
    advance(catalog, selection)
}

/// Resolve as far as possible and emit the matching prompt or command
fn advance(
    catalog: &CommandCatalog,
    selection: ConversationSelection,
) -> Result<Transition, SelectionError> {
    let (state, effect) = match resolve(catalog, &selection)? {
        Resolution::NeedPodList { namespace } => (
            FlowState::AwaitingResource(ResourceKind::Pod),
            Effect::PromptPods { namespace },
        ),
        Resolution::NeedDeploymentList { namespace } => (
            FlowState::AwaitingResource(ResourceKind::Deployment),
            Effect::PromptDeployments { namespace },
        ),
        Resolution::Ready(command) => (FlowState::Resolved, Effect::Execute(command)),
    };

    Ok(Transition {
        flow: ConversationFlow { state, selection },
        effect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(
        catalog: &CommandCatalog,
        flow: &ConversationFlow,
        event: SelectionEvent,
    ) -> Transition {
        transition(catalog, flow, event).unwrap()
    }

    #[test]
    fn test_get_flow_executes_after_namespace() {
        let catalog = CommandCatalog::default();
        let flow = ConversationFlow::default();

        let t = step(&catalog, &flow, SelectionEvent::CommandChosen("get".into()));
        assert_eq!(t.flow.state, FlowState::AwaitingSubCommand);
        assert_eq!(
            t.effect,
            Effect::PromptSubCommands {
                command: "get".into(),
                options: vec!["pods".into(), "nodes".into(), "services".into()],
            }
        );

        let t = step(&catalog, &t.flow, SelectionEvent::SubCommandChosen("pods".into()));
        assert_eq!(t.effect, Effect::PromptNamespaces);

        let t = step(&catalog, &t.flow, SelectionEvent::NamespaceChosen("default".into()));
        assert_eq!(t.flow.state, FlowState::Resolved);
        match t.effect {
            Effect::Execute(cmd) => assert_eq!(cmd.args(), "get pods -n default"),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn test_rollout_flow_prompts_deployments() {
        let catalog = CommandCatalog::default();
        let flow = ConversationFlow::default();

        let t = step(&catalog, &flow, SelectionEvent::CommandChosen("rollout restart".into()));
        let t = step(&catalog, &t.flow, SelectionEvent::SubCommandChosen("deployments".into()));
        let t = step(&catalog, &t.flow, SelectionEvent::NamespaceChosen("prod".into()));
        assert_eq!(
            t.flow.state,
            FlowState::AwaitingResource(ResourceKind::Deployment)
        );
        assert_eq!(
            t.effect,
            Effect::PromptDeployments {
                namespace: "prod".into()
            }
        );

        let t = step(&catalog, &t.flow, SelectionEvent::DeploymentChosen("api".into()));
        match t.effect {
            Effect::Execute(cmd) => {
                assert_eq!(cmd.to_shell_string(), "kubectl rollout restart deployment api -n prod")
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn test_new_command_resets_selection() {
        let catalog = CommandCatalog::default();
        let flow = ConversationFlow::default();

        let t = step(&catalog, &flow, SelectionEvent::CommandChosen("describe".into()));
        let t = step(&catalog, &t.flow, SelectionEvent::SubCommandChosen("pods".into()));
        let t = step(&catalog, &t.flow, SelectionEvent::NamespaceChosen("prod".into()));

        let t = step(&catalog, &t.flow, SelectionEvent::CommandChosen("get".into()));
        assert_eq!(t.flow.selection.command.as_deref(), Some("get"));
        assert!(t.flow.selection.sub_command.is_none());
        assert!(t.flow.selection.namespace.is_none());
    }

    #[test]
    fn test_pod_without_namespace_is_rejected() {
        let catalog = CommandCatalog::default();
        let result = transition(
            &catalog,
            &ConversationFlow::default(),
            SelectionEvent::PodChosen("web-1".into()),
        );
        assert_eq!(result, Err(SelectionError::NamespaceNotSelected));
    }

    #[test]
    fn test_deployment_for_pod_command_is_out_of_order() {
        let catalog = CommandCatalog::default();
        let flow = ConversationFlow::default();

        let t = step(&catalog, &flow, SelectionEvent::CommandChosen("logs".into()));
        let t = step(&catalog, &t.flow, SelectionEvent::SubCommandChosen("pods".into()));
        let t = step(&catalog, &t.flow, SelectionEvent::NamespaceChosen("prod".into()));

        let result = transition(&catalog, &t.flow, SelectionEvent::DeploymentChosen("api".into()));
        assert_eq!(
            result,
            Err(SelectionError::OutOfOrder { kind: "deployment" })
        );
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        let catalog = CommandCatalog::default();
        let flow = ConversationFlow::default();

        assert_eq!(
            transition(&catalog, &flow, SelectionEvent::CommandChosen("delete".into())),
            Err(SelectionError::UnknownCommand("delete".into()))
        );

        let t = step(&catalog, &flow, SelectionEvent::CommandChosen("describe".into()));
        assert!(matches!(
            transition(&catalog, &t.flow, SelectionEvent::SubCommandChosen("nodes".into())),
            Err(SelectionError::InvalidSubCommand { .. })
        ));
    }

    #[test]
    fn test_sub_command_before_command() {
        let catalog = CommandCatalog::default();
        assert_eq!(
            transition(
                &catalog,
                &ConversationFlow::default(),
                SelectionEvent::SubCommandChosen("pods".into())
            ),
            Err(SelectionError::Incomplete("command"))
        );
    }

    #[test]
    fn test_infer_matches_transitions() {
        let catalog = CommandCatalog::default();
        let mut selection = ConversationSelection::default();
        assert_eq!(FlowState::infer(&catalog, &selection), FlowState::AwaitingCommand);

        selection.set(SelectionField::Command, "logs");
        assert_eq!(FlowState::infer(&catalog, &selection), FlowState::AwaitingSubCommand);

        selection.set(SelectionField::SubCommand, "pods");
        assert_eq!(FlowState::infer(&catalog, &selection), FlowState::AwaitingNamespace);

        selection.set(SelectionField::Namespace, "prod");
        assert_eq!(
            FlowState::infer(&catalog, &selection),
            FlowState::AwaitingResource(ResourceKind::Pod)
        );

        selection.set(SelectionField::ResourceName, "web-1");
        assert_eq!(FlowState::infer(&catalog, &selection), FlowState::Resolved);
    }
}
