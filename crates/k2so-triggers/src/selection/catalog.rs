//! Static catalog of menu commands
//!
//! Ordered top-level commands, the sub-commands each one permits, and
//! which sub-commands need a resource (pod or deployment) picked before
//! the command can run.

/// Resource picked from a live listing before execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    Deployment,
}

impl ResourceKind {
    /// Singular kind word as kubectl expects it before a name
    pub fn word(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Deployment => "deployment",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Self::Pod => "pods",
            Self::Deployment => "deployments",
        }
    }
}

/// How a chosen resource is placed in the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStyle {
    /// `<command> <kind> <name>`, e.g. `describe pod web-1`
    Kinded,
    /// `<command> <name>`, e.g. `logs web-1`
    Bare,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubCommandSpec {
    pub name: String,
    pub resource: Option<ResourceKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub target_style: TargetStyle,
    pub sub_commands: Vec<SubCommandSpec>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_style: TargetStyle::Kinded,
            sub_commands: Vec::new(),
        }
    }

    pub fn sub_command(mut self, name: impl Into<String>, resource: Option<ResourceKind>) -> Self {
        self.sub_commands.push(SubCommandSpec {
            name: name.into(),
            resource,
        });
        self
    }

    pub fn bare_target(mut self) -> Self {
        self.target_style = TargetStyle::Bare;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandCatalog {
    program: String,
    commands: Vec<CommandSpec>,
}

impl CommandCatalog {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            commands: Vec::new(),
        }
    }

    pub fn with_command(mut self, spec: CommandSpec) -> Self {
        self.commands.push(spec);
        self
    }

    /// get / describe / logs / rollout restart
    pub fn kubectl() -> Self {
        Self::new("kubectl")
            .with_command(
                CommandSpec::new("get")
                    .sub_command("pods", None)
                    .sub_command("nodes", None)
                    .sub_command("services", None),
            )
            .with_command(CommandSpec::new("describe").sub_command("pods", Some(ResourceKind::Pod)))
            .with_command(
                CommandSpec::new("logs")
                    .sub_command("pods", Some(ResourceKind::Pod))
                    .bare_target(),
            )
            .with_command(
                CommandSpec::new("rollout restart")
                    .sub_command("deployments", Some(ResourceKind::Deployment)),
            )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.name.clone()).collect()
    }

    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn sub_command_names(&self, command: &str) -> Vec<String> {
        self.command(command)
            .map(|c| c.sub_commands.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn sub_command(&self, command: &str, sub_command: &str) -> Option<&SubCommandSpec> {
        self.command(command)?
            .sub_commands
            .iter()
            .find(|s| s.name == sub_command)
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::kubectl()
    }
}
