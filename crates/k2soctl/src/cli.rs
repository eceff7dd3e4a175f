use clap::{Parser, Subcommand};

use crate::commands;

/// K2SO - Slack ops bot for Kubernetes
#[derive(Parser, Debug)]
#[command(name = "k2soctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. info, debug, k2so_mcp=trace)
    #[arg(long, global = true, env = "K2SO_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Slack webhook server
    Serve {
        /// Configuration file (YAML)
        #[arg(short, long, env = "K2SO_CONFIG")]
        config: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Inspect and call tool servers
    Tools {
        /// Configuration file (YAML); bundled servers are used when omitted
        #[arg(short, long, global = true, env = "K2SO_CONFIG")]
        config: Option<String>,

        #[command(subcommand)]
        command: ToolsCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ToolsCommands {
    /// List the tools each server exposes
    List,

    /// Invoke one tool and print its text result
    Call {
        /// Registered server name (e.g. time)
        server: String,

        /// Tool name (e.g. get_current_time)
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Serve { config, port, host } => {
                commands::serve::execute(config.as_deref(), port, host.as_deref()).await
            }
            Commands::Tools { config, command } => match command {
                ToolsCommands::List => commands::tools::list(config.as_deref()).await,
                ToolsCommands::Call { server, tool, args } => {
                    commands::tools::call(config.as_deref(), &server, &tool, &args).await
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tools_call() {
        let cli = Cli::try_parse_from([
            "k2soctl",
            "tools",
            "call",
            "joke",
            "get_joke_by_index",
            "--args",
            r#"{"index": 3}"#,
        ])
        .unwrap();

        match cli.command {
            Commands::Tools {
                command: ToolsCommands::Call { server, tool, args },
                ..
            } => {
                assert_eq!(server, "joke");
                assert_eq!(tool, "get_joke_by_index");
                assert_eq!(args, r#"{"index": 3}"#);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["k2soctl", "--log-level", "debug", "serve", "-p", "3000"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Serve { port, .. } => assert_eq!(port, Some(3000)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
