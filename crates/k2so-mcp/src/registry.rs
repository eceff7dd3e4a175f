//! Registry of named tool servers
//!
//! Registrations are static. Sessions are created lazily on first use and
//! cached by name; a session that died (crash, EOF, garbage on stdout) is
//! dropped and transparently re-established on the next call.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use k2so_core::{K2soError, K2soResult, ToolServerConfig};

use crate::client::McpSession;
use crate::protocol::ToolDescriptor;

/// Tool discovery and invocation, as seen by the assistant
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Registered server names, sorted
    fn server_names(&self) -> Vec<String>;

    fn has_server(&self, name: &str) -> bool;

    async fn list_tools(&self, server: &str) -> K2soResult<Vec<ToolDescriptor>>;

    /// Tools for every registered server; a failing server maps to an empty list
    async fn list_all_tools(&self) -> BTreeMap<String, Vec<ToolDescriptor>>;

    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> K2soResult<String>;

    /// Close every live session
    async fn cleanup(&self);
}

/// Stdio tool server registry
#[derive(Default)]
pub struct McpRegistry {
    registrations: DashMap<String, ToolServerConfig>,
    sessions: DashMap<String, Arc<McpSession>>,
    connect_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a registration. Nothing is launched until first use.
    pub fn register(&self, config: ToolServerConfig) -> K2soResult<()> {
        config.validate().map_err(K2soError::config)?;

        let name = config.name.clone();
        info!(server = %name, command = %config.command, "Registering tool server");

        if self.registrations.insert(name.clone(), config).is_some() {
            warn!(server = %name, "Tool server registration overwritten");
            // Old session belongs to the old launch spec
            self.sessions.remove(&name);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Whether a live session is cached for `name`
    pub fn is_connected(&self, name: &str) -> bool {
        self.sessions
            .get(name)
            .map(|s| s.is_alive())
            .unwrap_or(false)
    }

    fn live_session(&self, name: &str) -> Option<Arc<McpSession>> {
        let session = self.sessions.get(name).map(|s| Arc::clone(s.value()))?;
        if session.is_alive() {
            return Some(session);
        }

        debug!(server = %name, "Discarding dead tool server session");
        self.sessions.remove_if(name, |_, s| !s.is_alive());
        None
    }

    /// Return the cached session, launching one if needed
    ///
    /// Connection establishment is serialized per server name; calls on an
    /// existing session never touch the lock.
    pub async fn connect(&self, name: &str) -> K2soResult<Arc<McpSession>> {
        if let Some(session) = self.live_session(name) {
            return Ok(session);
        }

        let config = self
            .registrations
            .get(name)
            .map(|c| c.value().clone())
            .ok_or_else(|| K2soError::connection(name, "Tool server is not registered"))?;

        let lock = self
            .connect_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have connected while we waited
        if let Some(session) = self.live_session(name) {
            return Ok(session);
        }

        info!(server = %name, "Connecting to tool server");
        let session = Arc::new(McpSession::connect(&config).await?);
        self.sessions.insert(name.to_string(), Arc::clone(&session));
        Ok(session)
    }

    /// Drop the cached session for `name`, killing the subprocess
    pub async fn disconnect(&self, name: &str) {
        if let Some((_, session)) = self.sessions.remove(name) {
            session.close().await;
            info!(server = %name, "Disconnected tool server");
        }
    }

    fn forget_if_dead(&self, name: &str, session: &McpSession) {
        if !session.is_alive() {
            warn!(server = %name, "Tool server transport failed; will reconnect on next use");
            self.sessions.remove_if(name, |_, s| !s.is_alive());
        }
    }
}

#[async_trait]
impl ToolProvider for McpRegistry {
    fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registrations.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn has_server(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }

    async fn list_tools(&self, server: &str) -> K2soResult<Vec<ToolDescriptor>> {
        let session = self.connect(server).await?;
        let result = session.list_tools().await;
        if result.is_err() {
            self.forget_if_dead(server, &session);
        }
        result
    }

    async fn list_all_tools(&self) -> BTreeMap<String, Vec<ToolDescriptor>> {
        let names = self.server_names();
        let discoveries = names.iter().map(|name| async move {
            let tools = match self.list_tools(name).await {
                Ok(tools) => {
                    debug!(server = %name, count = tools.len(), "Discovered tools");
                    tools
                }
                Err(e) => {
                    warn!(server = %name, error = %e, "Tool discovery failed");
                    Vec::new()
                }
            };
            (name.clone(), tools)
        });

        join_all(discoveries).await.into_iter().collect()
    }

    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> K2soResult<String> {
        let session = self.connect(server).await?;
        debug!(server = %server, tool = %tool, "Calling tool");

        let result = session.call_tool(tool, arguments).await;
        if let Err(ref e) = result {
            warn!(server = %server, tool = %tool, error = %e, "Tool call failed");
            self.forget_if_dead(server, &session);
        }
        result
    }

    async fn cleanup(&self) {
        let sessions: Vec<Arc<McpSession>> =
            self.sessions.iter().map(|e| Arc::clone(e.value())).collect();
        self.sessions.clear();

        for session in &sessions {
            session.close().await;
        }

        if !sessions.is_empty() {
            info!(count = sessions.len(), "Closed tool server sessions");
        }
    }
}
