//! Newline-delimited JSON-RPC 2.0 client for stdio MCP servers.

use super::error::ToolkitError;
use super::protocol::{ClientConnector, ListedTool, ProtocolClient, StdioTransport};
use crate::constants::PROTOCOL_VERSION;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, warn};

type BoxedWriter = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;
type Responder = oneshot::Sender<Result<Value, ToolkitError>>;

/// Default [`ClientConnector`]: runs the MCP `initialize` handshake over JSON-RPC.
#[derive(Debug, Clone)]
pub struct JsonRpcConnector {
    client_name: String,
    client_version: String,
}

impl JsonRpcConnector {
    pub fn new(client_name: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            client_version: client_version.into(),
        }
    }
}

impl Default for JsonRpcConnector {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl ClientConnector for JsonRpcConnector {
    async fn handshake(
        &self,
        server: &str,
        transport: StdioTransport,
    ) -> Result<Arc<dyn ProtocolClient>, ToolkitError> {
        let client = JsonRpcClient::start(server, transport.stdout, transport.stdin);
        if let Err(err) = client
            .initialize(&self.client_name, &self.client_version)
            .await
        {
            let _ = client.close().await;
            return Err(err);
        }
        Ok(Arc::new(client))
    }
}

#[derive(Clone)]
pub struct JsonRpcClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    server: String,
    writer: AsyncMutex<Option<BoxedWriter>>,
    pending: AsyncMutex<HashMap<String, Responder>>,
    id_counter: AtomicU64,
    instructions: Mutex<Option<String>>,
    closed: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<ListedTool>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

impl JsonRpcClient {
    /// Wire a client onto a reader/writer pair and start the inbound reader task.
    pub fn start<R, W>(server: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        let inner = Arc::new(ClientInner {
            server: server.into(),
            writer: AsyncMutex::new(Some(BufWriter::new(writer))),
            pending: AsyncMutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
            instructions: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let reader_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            reader_inner.reader_loop(reader).await;
        });

        Self { inner }
    }

    pub async fn initialize(
        &self,
        client_name: &str,
        client_version: &str,
    ) -> Result<(), ToolkitError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": client_name,
                "version": client_version,
            },
            "capabilities": {}
        });
        let init_result = self.inner.send_request("initialize", params).await?;
        if let Some(text) = init_result.get("instructions").and_then(Value::as_str) {
            *self
                .inner
                .instructions
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        }
        self.inner
            .send_notification("notifications/initialized", json!({}))
            .await
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolClient for JsonRpcClient {
    async fn list_tools(&self) -> Result<Vec<ListedTool>, ToolkitError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.inner.send_request("tools/list", params).await?;
            let page: ToolsPage =
                serde_json::from_value(result).map_err(|source| ToolkitError::InvalidJson {
                    server: self.inner.server.clone(),
                    source,
                })?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next);
                }
                Some(next) if !next.is_empty() => {
                    warn!(
                        server = %self.inner.server,
                        cursor = next,
                        "server repeated its tools/list cursor; stopping pagination"
                    );
                    break;
                }
                _ => break,
            }
        }
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolkitError> {
        let params = json!({
            "name": name,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        self.inner.send_request("tools/call", params).await
    }

    async fn close(&self) -> Result<(), ToolkitError> {
        self.inner.closed.store(true, Ordering::SeqCst);
        let writer = self.inner.writer.lock().await.take();
        self.inner.fail_all_pending(|server| ToolkitError::Cancelled { server }).await;
        if let Some(mut stream) = writer {
            stream
                .shutdown()
                .await
                .map_err(|source| self.inner.transport_error(source.to_string()))?;
        }
        Ok(())
    }

    fn instructions(&self) -> Option<String> {
        self.inner
            .instructions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ClientInner {
    async fn reader_loop<R>(self: Arc<Self>, reader: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('\u{1b}') {
                debug!(
                    server = %self.server,
                    line = trimmed,
                    "skipping non-JSON ANSI log line from MCP server"
                );
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => self.process_inbound_message(value).await,
                Err(source) => {
                    warn!(
                        server = %self.server,
                        line = trimmed,
                        %source,
                        "received invalid JSON from MCP server"
                    );
                }
            }
        }

        debug!(server = %self.server, "MCP server output stream closed");
        self.closed.store(true, Ordering::SeqCst);
        self.writer.lock().await.take();
        self.fail_all_pending(|server| ToolkitError::Terminated { server })
            .await;
    }

    async fn process_inbound_message(self: &Arc<Self>, value: Value) {
        match (value.get("id").cloned(), value.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, &value),
            (Some(id), false) => self.handle_response(id, value).await,
            (None, true) => self.handle_notification(&value),
            (None, false) => {}
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };

        let responder = self.pending.lock().await.remove(&key);
        let Some(sender) = responder else {
            debug!(
                server = %self.server,
                response_id = key,
                "received response for unknown request"
            );
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => Err(match error.as_object() {
                Some(err) => ToolkitError::Rpc {
                    server: self.server.clone(),
                    code: err.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                    message: err
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                },
                None => self.transport_error("missing error payload in response"),
            }),
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = sender.send(outcome);
    }

    /// Replies go out on their own task: the writer may be stuck behind a request
    /// the server will only read once this loop drains its output.
    fn handle_server_request(self: &Arc<Self>, id: Value, value: &Value) {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let reply = if method == "ping" {
            json!({ "jsonrpc": "2.0", "id": id, "result": {} })
        } else {
            warn!(
                server = %self.server,
                method,
                "server sent unsupported request"
            );
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": -32601,
                    "message": format!("client does not implement method '{method}'"),
                }
            })
        };

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = inner.write_message(&reply).await {
                warn!(server = %inner.server, %err, "failed to answer MCP server request");
            }
        });
    }

    fn handle_notification(&self, value: &Value) {
        if let Some(method) = value.get("method").and_then(Value::as_str) {
            debug!(
                server = %self.server,
                method,
                "received notification from server"
            );
            if method == "notifications/tools/list_changed" {
                warn!(
                    server = %self.server,
                    "server tool list changed; re-initialize the toolkit to pick it up"
                );
            }
        }
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolkitError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        // The reader may have hit end-of-stream before our entry landed.
        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(ToolkitError::Terminated {
                server: self.server.clone(),
            });
        }

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolkitError::Cancelled {
                server: self.server.clone(),
            }),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolkitError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolkitError> {
        let mut encoded =
            serde_json::to_string(message).map_err(|source| ToolkitError::InvalidJson {
                server: self.server.clone(),
                source,
            })?;
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| self.transport_error("connection to server is closed"))?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))
    }

    async fn fail_all_pending(&self, reason: impl Fn(String) -> ToolkitError) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(reason(self.server.clone())));
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolkitError {
        ToolkitError::Transport {
            server: self.server.clone(),
            message: message.into(),
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}
