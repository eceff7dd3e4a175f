//! Cluster inventory via kubectl
//!
//! Supplies the names shown in the namespace, pod, and deployment menus.
//! Requires kubectl in PATH with a working kubeconfig.

use async_trait::async_trait;
use tracing::debug;

use k2so_core::{K2soError, K2soResult};

use crate::executor::execute_command;

const NAMES_JSONPATH: &str = "jsonpath={.items[*].metadata.name}";

/// Live listing of cluster resources
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    async fn namespaces(&self) -> K2soResult<Vec<String>>;

    async fn pods(&self, namespace: &str) -> K2soResult<Vec<String>>;

    async fn deployments(&self, namespace: &str) -> K2soResult<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct KubectlInventory {
    program: String,
    timeout_secs: u64,
}

impl KubectlInventory {
    pub fn new() -> Self {
        Self {
            program: "kubectl".to_string(),
            timeout_secs: 15,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    async fn list(&self, kind: &str, namespace: Option<&str>) -> K2soResult<Vec<String>> {
        let mut args = vec!["get", kind];
        if let Some(ns) = namespace {
            args.extend(["-n", ns]);
        }
        args.extend(["-o", NAMES_JSONPATH]);

        let output = execute_command(&self.program, &args, self.timeout_secs).await?;
        if !output.success {
            return Err(K2soError::tool(format!(
                "{} get {} failed: {}",
                self.program,
                kind,
                output.error_detail().trim()
            )));
        }

        let names = parse_names(&output.stdout);
        debug!(kind = %kind, namespace = ?namespace, count = names.len(), "Listed resources");
        Ok(names)
    }
}

impl Default for KubectlInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterInventory for KubectlInventory {
    async fn namespaces(&self) -> K2soResult<Vec<String>> {
        self.list("namespaces", None).await
    }

    async fn pods(&self, namespace: &str) -> K2soResult<Vec<String>> {
        self.list("pods", Some(namespace)).await
    }

    async fn deployments(&self, namespace: &str) -> K2soResult<Vec<String>> {
        self.list("deployments", Some(namespace)).await
    }
}

fn parse_names(stdout: &str) -> Vec<String> {
    stdout.split_whitespace().map(str::to_string).collect()
}
