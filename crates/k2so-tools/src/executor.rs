//! Process execution
//!
//! Two entry points:
//! - [`ShellExecutor`] runs a resolved command line through `sh -c`. The
//!   command text is trusted: every interpolated value comes from a fixed
//!   catalog or from names returned by an earlier listing call, never from
//!   free text typed by a user. Shell metacharacters are passed through as-is.
//! - [`execute_command`] runs a program with an argument vector, no shell.
//!
//! Both enforce a timeout; the child is killed when it expires.

use async_trait::async_trait;
use serde::Serialize;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use k2so_core::{K2soError, K2soResult};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Roughly what fits in one chat message with formatting
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 3000;

/// Captured result of a finished process
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// Whether stdout or stderr was cut to the size ceiling
    pub truncated: bool,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            truncated: false,
        }
    }

    /// Error detail for a failed run: stderr, or stdout when stderr is empty
    pub fn error_detail(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    fn truncate(mut self, max_chars: usize) -> Self {
        let (stdout, cut_out) = truncate_output(&self.stdout, max_chars);
        let (stderr, cut_err) = truncate_output(&self.stderr, max_chars);
        self.stdout = stdout;
        self.stderr = stderr;
        self.truncated = cut_out || cut_err;
        self
    }
}

/// Cut `text` to at most `max_chars` characters, appending an indicator
///
/// Returns the (possibly shortened) text and whether anything was cut.
pub fn truncate_output(text: &str, max_chars: usize) -> (String, bool) {
    let total = text.chars().count();
    if total <= max_chars {
        return (text.to_string(), false);
    }

    let kept: String = text.chars().take(max_chars).collect();
    (
        format!(
            "{}\n... [Output truncated - {} more characters]",
            kept,
            total - max_chars
        ),
        true,
    )
}

/// Render a run as chat text: output in a code block, or the error detail
pub fn format_for_chat(result: &K2soResult<CommandOutput>) -> String {
    match result {
        Ok(output) if output.success => {
            if output.stdout.trim().is_empty() {
                "Command completed with no output.".to_string()
            } else {
                format!("```\n{}\n```", output.stdout.trim_end())
            }
        }
        Ok(output) => format!(
            "Error executing command (exit code {}):\n```\n{}\n```",
            output.exit_code,
            output.error_detail().trim_end()
        ),
        Err(K2soError::Timeout(msg)) => format!("⏱️ {}", msg),
        Err(e) => format!("Error executing command:\n```\n{}\n```", e),
    }
}

/// Runs a resolved command line
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> K2soResult<CommandOutput>;
}

/// `sh -c` executor with timeout and output ceiling
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    timeout: Duration,
    max_output_chars: usize,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_chars(mut self, max_output_chars: usize) -> Self {
        self.max_output_chars = max_output_chars;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellExecutor {
    async fn run(&self, command: &str) -> K2soResult<CommandOutput> {
        debug!(command = %command, shell = %self.shell, "Executing shell command");

        let mut cmd = Command::new(&self.shell);
        cmd.args(["-c", command]);

        let output = run_to_completion(cmd, self.timeout, command).await?;
        let output = CommandOutput::from_output(output).truncate(self.max_output_chars);

        if !output.success {
            warn!(command = %command, exit_code = output.exit_code, "Command exited non-zero");
        }
        Ok(output)
    }
}

/// Run `program` with `args` directly (no shell)
pub async fn execute_command(
    program: &str,
    args: &[&str],
    timeout_secs: u64,
) -> K2soResult<CommandOutput> {
    let label = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(command = %label, "Executing command");

    let mut cmd = Command::new(program);
    cmd.args(args);

    let output = run_to_completion(cmd, Duration::from_secs(timeout_secs), &label).await?;
    Ok(CommandOutput::from_output(output))
}

async fn run_to_completion(mut cmd: Command, limit: Duration, label: &str) -> K2soResult<Output> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| K2soError::tool(format!("Failed to spawn `{}`: {}", label, e)))?;

    // On expiry the wait future is dropped with the child inside it, which kills it
    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(K2soError::tool(format!("Command `{}` failed: {}", label, e))),
        Err(_) => {
            warn!(command = %label, timeout_secs = limit.as_secs(), "Command timed out; killed");
            Err(K2soError::timeout(format!(
                "Command timed out after {} seconds: `{}`",
                limit.as_secs(),
                label
            )))
        }
    }
}
