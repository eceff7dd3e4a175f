//! K2SO Tools - process execution and CLI wrappers
//!
//! - [`executor`]: shell and argv execution with timeout and output ceiling
//! - [`kubectl`]: namespace / pod / deployment listing for the menus
//! - [`argocd`]: ArgoCD application status, history, sync, and rollback

pub mod argocd;
pub mod executor;
pub mod kubectl;

pub use argocd::ArgoCdClient;
pub use executor::{
    execute_command, format_for_chat, truncate_output, CommandOutput, CommandRunner, ShellExecutor,
    DEFAULT_MAX_OUTPUT_CHARS, DEFAULT_TIMEOUT_SECS,
};
pub use kubectl::{ClusterInventory, KubectlInventory};
