use super::error::ToolkitError;
use super::launch::LaunchSpec;
use super::process::{Termination, terminate_child};
use super::protocol::{ClientConnector, ListedTool, ProtocolClient, StdioTransport};
use crate::constants::TERMINATION_GRACE;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Closed,
}

impl ConnectionState {
    fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Unconnected => "unconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        }
    }
}

/// What a call to [`Connection::close`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// A previous call already closed the connection; nothing was signalled.
    AlreadyClosed,
    /// This call closed the connection; `termination` is `None` when no child was held.
    Closed { termination: Option<Termination> },
}

/// One subprocess plus the protocol client speaking to it. Single use: once
/// closed, a fresh `Connection` is needed to reconnect.
pub struct Connection {
    server: String,
    connector: Arc<dyn ClientConnector>,
    grace: Duration,
    inner: Mutex<ConnectionInner>,
}

struct ConnectionInner {
    state: ConnectionState,
    child: Option<Child>,
    client: Option<Arc<dyn ProtocolClient>>,
    pid: Option<u32>,
}

impl Connection {
    pub fn new(server: impl Into<String>, connector: Arc<dyn ClientConnector>) -> Self {
        Self {
            server: server.into(),
            connector,
            grace: TERMINATION_GRACE,
            inner: Mutex::new(ConnectionInner {
                state: ConnectionState::Unconnected,
                child: None,
                client: None,
                pid: None,
            }),
        }
    }

    /// Override how long a child gets between SIGTERM and SIGKILL.
    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Last known process id of the subprocess.
    pub fn pid(&self) -> Option<u32> {
        self.lock().pid
    }

    pub fn instructions(&self) -> Option<String> {
        self.lock().client.as_ref().and_then(|client| client.instructions())
    }

    /// Spawn the subprocess and run the protocol handshake over its stdio.
    ///
    /// On failure the connection is closed and any spawned child terminated
    /// before the error is returned.
    pub async fn connect(&self, spec: &LaunchSpec) -> Result<(), ToolkitError> {
        let transport = {
            let mut inner = self.lock();
            if inner.state != ConnectionState::Unconnected {
                return Err(self.protocol_error(inner.state, "connect"));
            }
            inner.state = ConnectionState::Connecting;

            let mut child = match spec.command().spawn() {
                Ok(child) => child,
                Err(source) => {
                    inner.state = ConnectionState::Closed;
                    return Err(ToolkitError::Spawn {
                        server: self.server.clone(),
                        source,
                    });
                }
            };
            inner.pid = child.id();
            let streams = child.stdin.take().zip(child.stdout.take());
            inner.child = Some(child);
            streams.map(|(stdin, stdout)| StdioTransport { stdin, stdout })
        };

        info!(
            server = %self.server,
            program = %spec.program,
            pid = ?self.pid(),
            "Spawned MCP server process"
        );

        let handshake = match transport {
            Some(transport) => self.connector.handshake(&self.server, transport).await,
            None => Err(ToolkitError::Transport {
                server: self.server.clone(),
                message: "failed to capture server stdio".to_string(),
            }),
        };

        let outcome = {
            let mut inner = self.lock();
            match handshake {
                Ok(client) if inner.state == ConnectionState::Connecting => {
                    inner.client = Some(client);
                    inner.state = ConnectionState::Connected;
                    Ok(())
                }
                Ok(client) => Err((
                    Some(client),
                    ToolkitError::Transport {
                        server: self.server.clone(),
                        message: "connection was closed during the handshake".to_string(),
                    },
                )),
                Err(err) => {
                    inner.state = ConnectionState::Closed;
                    Err((None, err))
                }
            }
        };

        match outcome {
            Ok(()) => {
                debug!(server = %self.server, "MCP handshake complete");
                Ok(())
            }
            Err((stray_client, err)) => {
                warn!(server = %self.server, %err, "MCP server failed to connect");
                if let Some(client) = stray_client {
                    self.close_client(client).await;
                }
                let child = self.lock().child.take();
                if let Some(child) = child {
                    terminate_child(&self.server, child, self.grace).await;
                }
                Err(err)
            }
        }
    }

    pub async fn list_tools(&self) -> Result<Vec<ListedTool>, ToolkitError> {
        let client = self.connected_client("list tools")?;
        client.list_tools().await
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolkitError> {
        let client = self.connected_client("call tools")?;
        client.call_tool(name, arguments).await
    }

    /// Idempotent, best-effort teardown. Never fails; problems are logged.
    pub async fn close(&self) -> CloseOutcome {
        let (client, child) = {
            let mut inner = self.lock();
            if inner.state == ConnectionState::Closed {
                return CloseOutcome::AlreadyClosed;
            }
            inner.state = ConnectionState::Closed;
            (inner.client.take(), inner.child.take())
        };

        if let Some(client) = client {
            self.close_client(client).await;
        }

        let termination = match child {
            Some(child) => Some(terminate_child(&self.server, child, self.grace).await),
            None => None,
        };
        info!(server = %self.server, ?termination, "Closed MCP server connection");
        CloseOutcome::Closed { termination }
    }

    async fn close_client(&self, client: Arc<dyn ProtocolClient>) {
        if let Err(err) = client.close().await {
            warn!(
                server = %self.server,
                %err,
                "graceful transport close failed; continuing teardown"
            );
        }
    }

    fn connected_client(
        &self,
        operation: &'static str,
    ) -> Result<Arc<dyn ProtocolClient>, ToolkitError> {
        let inner = self.lock();
        match (&inner.client, inner.state) {
            (Some(client), ConnectionState::Connected) => Ok(Arc::clone(client)),
            (_, state) => Err(self.protocol_error(state, operation)),
        }
    }

    fn protocol_error(&self, state: ConnectionState, operation: &'static str) -> ToolkitError {
        ToolkitError::Protocol {
            server: self.server.clone(),
            state: state.as_str(),
            operation,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
