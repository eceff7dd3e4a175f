//! Stdio session with one tool server subprocess
//!
//! Requests are written as single lines to the child's stdin. A background
//! reader task routes response lines back to waiting callers by id, so
//! concurrent calls on one session do not block each other.

use dashmap::DashMap;
use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use k2so_core::{K2soError, K2soResult, ToolServerConfig};

use crate::protocol::{
    parse_tool_list, result_text, JsonRpcRequest, JsonRpcResponse, ToolDescriptor,
    METHOD_NOT_FOUND,
};

type PendingMap = DashMap<u64, oneshot::Sender<JsonRpcResponse>>;

const CLIENT_NAME: &str = "k2so";

/// Live connection to one tool server
pub struct McpSession {
    server: String,
    child: Mutex<Option<Child>>,
    stdin: Mutex<ChildStdin>,
    pending: Arc<PendingMap>,
    alive: Arc<AtomicBool>,
    next_id: AtomicU64,
    timeout: Duration,
    reader: JoinHandle<()>,
}

impl McpSession {
    /// Launch the subprocess and complete the handshake
    pub async fn connect(config: &ToolServerConfig) -> K2soResult<Self> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            K2soError::connection(
                &config.name,
                format!("Failed to spawn '{}': {}", config.command, e),
            )
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| K2soError::connection(&config.name, "Child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| K2soError::connection(&config.name, "Child stdout unavailable"))?;

        let pending: Arc<PendingMap> = Arc::new(DashMap::new());
        let alive = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(read_loop(
            config.name.clone(),
            stdout,
            Arc::clone(&pending),
            Arc::clone(&alive),
        ));

        let session = Self {
            server: config.name.clone(),
            child: Mutex::new(Some(child)),
            stdin: Mutex::new(stdin),
            pending,
            alive,
            next_id: AtomicU64::new(1),
            timeout: Duration::from_secs(config.timeout_secs),
            reader,
        };

        session.handshake().await?;
        info!(server = %session.server, "Tool server session established");
        Ok(session)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn handshake(&self) -> K2soResult<()> {
        let request = JsonRpcRequest::initialize(self.next_id(), CLIENT_NAME, k2so_core::VERSION);
        let response = self.request(request).await.map_err(|e| {
            K2soError::connection(&self.server, format!("Handshake failed: {}", e))
        })?;

        match response.into_result() {
            Ok(_) => Ok(()),
            // Servers without an initialize method are still usable
            Err(e) if e.code == METHOD_NOT_FOUND => {
                debug!(server = %self.server, "Server has no initialize method; continuing");
                Ok(())
            }
            Err(e) => Err(K2soError::connection(
                &self.server,
                format!("Handshake rejected: {}", e),
            )),
        }
    }

    pub async fn list_tools(&self) -> K2soResult<Vec<ToolDescriptor>> {
        let response = self.request(JsonRpcRequest::list_tools(self.next_id())).await?;
        let result = response
            .into_result()
            .map_err(|e| K2soError::tool_call(&self.server, "tools/list", e.to_string()))?;

        parse_tool_list(&result).map_err(|e| {
            K2soError::protocol(format!(
                "Malformed tools/list result from '{}': {}",
                self.server, e
            ))
        })
    }

    pub async fn call_tool(&self, tool: &str, arguments: Value) -> K2soResult<String> {
        let request = JsonRpcRequest::call_tool(self.next_id(), tool, arguments);
        let response = self
            .request(request)
            .await
            .map_err(|e| K2soError::tool_call(&self.server, tool, e.to_string()))?;

        let result = response
            .into_result()
            .map_err(|e| K2soError::tool_call(&self.server, tool, e.message))?;

        Ok(result_text(&result))
    }

    async fn request(&self, request: JsonRpcRequest) -> K2soResult<JsonRpcResponse> {
        if !self.is_alive() {
            return Err(K2soError::connection(&self.server, "Session is closed"));
        }

        let id = request
            .id
            .as_ref()
            .and_then(Value::as_u64)
            .ok_or_else(|| K2soError::protocol("Request id must be numeric"))?;
        let method = request.method.clone();

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        if let Err(e) = self.write_line(&line).await {
            self.pending.remove(&id);
            self.alive.store(false, Ordering::SeqCst);
            return Err(K2soError::connection(
                &self.server,
                format!("Write failed: {}", e),
            ));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(K2soError::connection(
                &self.server,
                "Tool server closed the connection",
            )),
            Err(_) => {
                self.pending.remove(&id);
                Err(K2soError::timeout(format!(
                    "'{}' did not answer {} within {}s",
                    self.server,
                    method,
                    self.timeout.as_secs()
                )))
            }
        }
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await
    }

    /// Kill the subprocess and fail any in-flight requests
    pub async fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.reader.abort();
        self.pending.clear();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                debug!(server = %self.server, error = %e, "Kill failed (process already gone?)");
            }
        }
        debug!(server = %self.server, "Tool server session closed");
    }
}

impl Drop for McpSession {
    fn drop(&mut self) {
        // Child is killed by kill_on_drop
        self.reader.abort();
    }
}

async fn read_loop(
    server: String,
    stdout: ChildStdout,
    pending: Arc<PendingMap>,
    alive: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match serde_json::from_str::<JsonRpcResponse>(line) {
                    Ok(response) => {
                        match response.numeric_id().and_then(|id| pending.remove(&id)) {
                            Some((_, tx)) => {
                                let _ = tx.send(response);
                            }
                            None => {
                                warn!(server = %server, id = %response.id, "Dropping response with no pending request");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(server = %server, error = %e, "Non-JSON output from tool server; closing session");
                        break;
                    }
                }
            }
            Ok(None) => {
                debug!(server = %server, "Tool server closed stdout");
                break;
            }
            Err(e) => {
                warn!(server = %server, error = %e, "Failed reading from tool server");
                break;
            }
        }
    }

    alive.store(false, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with a closed-channel error
    pending.clear();
}
