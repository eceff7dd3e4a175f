//! Tool server registration types
//!
//! A tool server is a local subprocess speaking line-delimited JSON-RPC
//! over stdin/stdout. Registrations are read from the serve YAML or built
//! in code for the bundled servers.
//!
//! # Example YAML
//! ```yaml
//! tool_servers:
//!   - name: time
//!     command: /usr/local/bin/time-mcp
//!   - name: github
//!     command: github-mcp
//!     args: ["--stdio"]
//!     env:
//!       GITHUB_TOKEN: ghp_xxx
//!     timeout_secs: 10
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Launch specification for one tool server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolServerConfig {
    /// Unique server name, used as the registry key and in `server.tool` references
    pub name: String,

    /// Executable to launch
    pub command: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment overlay applied on top of the bot's own environment
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Bound for the handshake and for each individual request
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl ToolServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Tool server name cannot be empty".to_string());
        }
        if self.name.contains('.') {
            return Err(format!(
                "Tool server name '{}' cannot contain '.'",
                self.name
            ));
        }
        if self.command.trim().is_empty() {
            return Err(format!("Tool server '{}' requires a command", self.name));
        }
        if self.timeout_secs == 0 {
            return Err(format!(
                "Tool server '{}' timeout_secs must be greater than zero",
                self.name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ToolServerConfig::new("time", "time-mcp")
            .with_args(vec!["--verbose".to_string()])
            .with_env_var("TZ", "UTC")
            .with_timeout(5);

        assert_eq!(config.name, "time");
        assert_eq!(config.args, vec!["--verbose"]);
        assert_eq!(config.env.get("TZ"), Some(&"UTC".to_string()));
        assert_eq!(config.timeout_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = r#"
name: joke
command: joke-mcp
"#;
        let config: ToolServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.args.is_empty());
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_yaml_full() {
        let yaml = r#"
name: github
command: github-mcp
args: ["--stdio"]
env:
  GITHUB_TOKEN: ghp_test
timeout_secs: 10
"#;
        let config: ToolServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.args, vec!["--stdio"]);
        assert_eq!(config.env.get("GITHUB_TOKEN"), Some(&"ghp_test".to_string()));
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_validation() {
        assert!(ToolServerConfig::new("", "cmd").validate().is_err());
        assert!(ToolServerConfig::new("a.b", "cmd").validate().is_err());
        assert!(ToolServerConfig::new("time", " ").validate().is_err());
        assert!(ToolServerConfig::new("time", "cmd")
            .with_timeout(0)
            .validate()
            .is_err());
    }
}
