//! ArgoCD CLI wrapper
//!
//! Read operations (list, status, history) use a 15s timeout; mutations
//! (sync, rollback) use 30s. Output parsing is kept in free functions so it
//! can be tested against captured CLI JSON.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use k2so_core::{K2soError, K2soResult};

use crate::executor::{execute_command, CommandOutput};

pub const CLI_NOT_FOUND: &str = "ArgoCD CLI not found. Please install 'argocd' CLI tool.";

const SUMMARY_PREFIXES: &[&str] = &[
    "Name:",
    "Project:",
    "Sync Status:",
    "Health Status:",
    "Sync Revision:",
    "Phase:",
    "Duration:",
    "Message:",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApplicationSummary {
    pub name: String,
    pub namespace: String,
    pub server: String,
    pub sync_status: String,
    pub health_status: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApplicationStatus {
    pub name: String,
    pub sync_status: String,
    pub health_status: String,
    pub current_revision: String,
    pub target_revision: String,
    pub repo_url: String,
    pub path: String,
    pub namespace: String,
    pub server: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevisionEntry {
    pub id: i64,
    pub revision: String,
    pub deployed_at: String,
}

/// What a rollback would do; shown to the user before anything runs
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RollbackPlan {
    pub app_name: String,
    pub revision_id: i64,
    pub current_revision: String,
    pub target: RevisionEntry,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RollbackOutcome {
    pub app_name: String,
    pub revision_id: i64,
    /// Key lines from the CLI's post-rollback report, if it printed one
    pub summary: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArgoCdClient {
    program: String,
    read_timeout_secs: u64,
    write_timeout_secs: u64,
}

impl ArgoCdClient {
    pub fn new() -> Self {
        Self {
            program: "argocd".to_string(),
            read_timeout_secs: 15,
            write_timeout_secs: 30,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    async fn run(&self, args: &[&str], timeout_secs: u64) -> K2soResult<CommandOutput> {
        if !self.is_available() {
            return Err(K2soError::tool(CLI_NOT_FOUND));
        }
        execute_command(&self.program, args, timeout_secs).await
    }

    async fn run_ok(&self, args: &[&str], timeout_secs: u64, action: &str) -> K2soResult<String> {
        let output = self.run(args, timeout_secs).await?;
        if !output.success {
            let detail = output.error_detail().trim().to_string();
            error!(action = %action, error = %detail, "argocd command failed");
            return Err(K2soError::tool(format!("Failed to {}: {}", action, detail)));
        }
        Ok(output.stdout.trim().to_string())
    }

    pub async fn list_applications(&self) -> K2soResult<Vec<ApplicationSummary>> {
        let stdout = self
            .run_ok(&["app", "list", "-o", "json"], self.read_timeout_secs, "list applications")
            .await?;
        parse_application_list(&stdout)
    }

    pub async fn application_status(&self, app: &str) -> K2soResult<ApplicationStatus> {
        let stdout = self
            .run_ok(
                &["app", "get", app, "-o", "json"],
                self.read_timeout_secs,
                "get application status",
            )
            .await?;
        parse_application_status(app, &stdout)
    }

    /// Deployment history, newest first
    pub async fn history(&self, app: &str, limit: usize) -> K2soResult<Vec<RevisionEntry>> {
        let stdout = self
            .run_ok(
                &["app", "history", app, "-o", "json"],
                self.read_timeout_secs,
                "get application history",
            )
            .await?;
        parse_history(&stdout, limit)
    }

    pub async fn sync(&self, app: &str, revision: Option<&str>) -> K2soResult<String> {
        let mut args = vec!["app", "sync", app];
        if let Some(rev) = revision {
            args.extend(["--revision", rev]);
        }
        info!(app = %app, revision = ?revision, "Syncing ArgoCD application");
        self.run_ok(&args, self.write_timeout_secs, "sync application")
            .await
    }

    /// Validate the target revision and describe the rollback without running it
    pub async fn prepare_rollback(&self, app: &str, revision_id: i64) -> K2soResult<RollbackPlan> {
        let status = self.application_status(app).await?;
        let history = self.history(app, 20).await?;

        let target = history
            .into_iter()
            .find(|r| r.id == revision_id)
            .ok_or_else(|| {
                K2soError::tool(format!(
                    "Revision #{} not found for application {}",
                    revision_id, app
                ))
            })?;

        Ok(RollbackPlan {
            app_name: app.to_string(),
            revision_id,
            current_revision: status.current_revision,
            target,
        })
    }

    pub async fn rollback(&self, app: &str, revision_id: i64) -> K2soResult<RollbackOutcome> {
        let revision = revision_id.to_string();
        info!(app = %app, revision = %revision, "Rolling back ArgoCD application");

        let output = self
            .run(&["app", "rollback", app, &revision], self.write_timeout_secs)
            .await?;

        if !output.success {
            let detail = output.error_detail().trim().to_string();
            error!(app = %app, error = %detail, "Rollback failed");
            return Err(K2soError::tool(rollback_failure_message(app, revision_id, &detail)));
        }

        Ok(RollbackOutcome {
            app_name: app.to_string(),
            revision_id,
            summary: extract_rollback_summary(&output.stdout),
        })
    }
}

impl Default for ArgoCdClient {
    fn default() -> Self {
        Self::new()
    }
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
}

fn field(value: &Value, path: &[&str], default: &str) -> String {
    str_at(value, path).unwrap_or(default).to_string()
}

fn parse_json(stdout: &str, what: &str) -> K2soResult<Value> {
    serde_json::from_str(stdout)
        .map_err(|e| K2soError::tool(format!("Failed to parse ArgoCD {}: {}", what, e)))
}

pub fn parse_application_list(stdout: &str) -> K2soResult<Vec<ApplicationSummary>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let apps = parse_json(stdout, "application list")?;
    Ok(apps
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|app| ApplicationSummary {
                    name: field(app, &["metadata", "name"], "unknown"),
                    namespace: field(app, &["metadata", "namespace"], "unknown"),
                    server: field(app, &["spec", "destination", "server"], "unknown"),
                    sync_status: field(app, &["status", "sync", "status"], "unknown"),
                    health_status: field(app, &["status", "health", "status"], "unknown"),
                })
                .collect()
        })
        .unwrap_or_default())
}

pub fn parse_application_status(app: &str, stdout: &str) -> K2soResult<ApplicationStatus> {
    let data = parse_json(stdout, "application status")?;
    Ok(ApplicationStatus {
        name: app.to_string(),
        sync_status: field(&data, &["status", "sync", "status"], "Unknown"),
        health_status: field(&data, &["status", "health", "status"], "Unknown"),
        current_revision: field(&data, &["status", "sync", "revision"], "Unknown"),
        target_revision: field(&data, &["spec", "source", "targetRevision"], "Unknown"),
        repo_url: field(&data, &["spec", "source", "repoURL"], "Unknown"),
        path: field(&data, &["spec", "source", "path"], "Unknown"),
        namespace: field(&data, &["spec", "destination", "namespace"], "Unknown"),
        server: field(&data, &["spec", "destination", "server"], "Unknown"),
    })
}

pub fn parse_history(stdout: &str, limit: usize) -> K2soResult<Vec<RevisionEntry>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let data = parse_json(stdout, "history")?;
    let mut entries: Vec<RevisionEntry> = data
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|rev| RevisionEntry {
                    id: rev.get("id").and_then(Value::as_i64).unwrap_or(-1),
                    revision: field(rev, &["revision"], "unknown"),
                    deployed_at: field(rev, &["deployedAt"], "unknown"),
                })
                .collect()
        })
        .unwrap_or_default();

    // RFC 3339 timestamps sort lexically
    entries.sort_by(|a, b| b.deployed_at.cmp(&a.deployed_at));
    entries.truncate(limit);
    Ok(entries)
}

/// Keep the key status lines of `argocd app rollback` output
///
/// The report starts at the first `Name:` line and ends at the resource
/// table (`GROUP ...`) or the first blank line.
pub fn extract_rollback_summary(stdout: &str) -> Option<String> {
    let lines: Vec<&str> = stdout.lines().collect();
    let start = lines.iter().position(|l| l.starts_with("Name:"))?;

    let summary: Vec<&str> = lines[start..]
        .iter()
        .take_while(|l| !l.starts_with("GROUP") && !l.trim().is_empty())
        .filter(|l| SUMMARY_PREFIXES.iter().any(|p| l.starts_with(p)))
        .copied()
        .collect();

    if summary.is_empty() {
        None
    } else {
        Some(summary.join("\n"))
    }
}

pub fn rollback_failure_message(app: &str, revision_id: i64, detail: &str) -> String {
    if detail.contains("auto-sync is enabled") {
        format!(
            "Rollback blocked: auto-sync is enabled for `{app}`.\n\
             Options:\n\
             • Disable auto-sync: `argocd app set {app} --sync-policy=none`\n\
             • Sync the revision instead: `argocd app sync {app} --revision {revision_id}`\n\
             • Roll back through the Git repository\n\n\
             {detail}"
        )
    } else {
        format!("Rollback failed: {}", detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_application_list() {
        let stdout = r#"[
            {"metadata":{"name":"web","namespace":"argocd"},
             "spec":{"destination":{"server":"https://kubernetes.default.svc"}},
             "status":{"sync":{"status":"Synced"},"health":{"status":"Healthy"}}},
            {"metadata":{"name":"api"}}
        ]"#;
        let apps = parse_application_list(stdout).unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].sync_status, "Synced");
        assert_eq!(apps[1].health_status, "unknown");
        assert!(parse_application_list("").unwrap().is_empty());
        assert!(parse_application_list("not json").is_err());
    }

    #[test]
    fn test_parse_application_status() {
        let stdout = r#"{
            "spec":{"source":{"repoURL":"https://git/repo","path":"k8s","targetRevision":"HEAD"},
                    "destination":{"namespace":"prod","server":"https://kubernetes.default.svc"}},
            "status":{"sync":{"status":"OutOfSync","revision":"abc123def"},"health":{"status":"Degraded"}}
        }"#;
        let status = parse_application_status("web", stdout).unwrap();
        assert_eq!(status.name, "web");
        assert_eq!(status.sync_status, "OutOfSync");
        assert_eq!(status.current_revision, "abc123def");
        assert_eq!(status.namespace, "prod");
    }

    #[test]
    fn test_parse_history_newest_first_with_limit() {
        let stdout = r#"[
            {"id":1,"revision":"aaa","deployedAt":"2024-01-01T10:00:00Z"},
            {"id":3,"revision":"ccc","deployedAt":"2024-01-03T10:00:00Z"},
            {"id":2,"revision":"bbb","deployedAt":"2024-01-02T10:00:00Z"}
        ]"#;
        let history = parse_history(stdout, 2).unwrap();
        assert_eq!(history.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn test_extract_rollback_summary() {
        let stdout = "\
Some preamble
Name:               argocd/web
Project:            default
Server:             https://kubernetes.default.svc
Sync Status:        OutOfSync from HEAD
Health Status:      Progressing
Phase:              Succeeded

GROUP  KIND        NAMESPACE  NAME
apps   Deployment  prod       web";

        let summary = extract_rollback_summary(stdout).unwrap();
        assert_eq!(summary.lines().count(), 5);
        assert!(summary.starts_with("Name:"));
        assert!(!summary.contains("Server:"));
        assert!(!summary.contains("Deployment"));

        assert!(extract_rollback_summary("no report here").is_none());
    }

    #[test]
    fn test_rollback_failure_auto_sync_hint() {
        let msg = rollback_failure_message(
            "web",
            4,
            "rpc error: rollback cannot be initiated when auto-sync is enabled",
        );
        assert!(msg.contains("--sync-policy=none"));
        assert!(msg.contains("--revision 4"));

        let plain = rollback_failure_message("web", 4, "permission denied");
        assert_eq!(plain, "Rollback failed: permission denied");
    }

    #[tokio::test]
    async fn test_missing_cli() {
        let client = ArgoCdClient::new().with_program("k2so-no-such-argocd");
        let err = client.list_applications().await.unwrap_err();
        assert_eq!(err.to_string(), format!("Tool error: {}", CLI_NOT_FOUND));
    }
}
