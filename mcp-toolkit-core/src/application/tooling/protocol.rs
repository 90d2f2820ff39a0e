//! Contract between a [`super::Connection`] and the wire protocol that talks to the
//! subprocess. The crate ships [`super::JsonRpcConnector`]; anything that can
//! list and call tools over the child's stdio can stand in for it.

use super::error::ToolkitError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::process::{ChildStdin, ChildStdout};

/// One entry of a `tools/list` reply, before schema validation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ListedTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Option<Value>,
}

/// The child's standard streams handed to the connector.
pub struct StdioTransport {
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ListedTool>, ToolkitError>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolkitError>;

    /// Graceful transport shutdown. Clients without one keep the default.
    async fn close(&self) -> Result<(), ToolkitError> {
        Ok(())
    }

    /// Usage instructions the server sent during the handshake, if any.
    fn instructions(&self) -> Option<String> {
        None
    }
}

/// Performs the protocol handshake over a freshly spawned child's stdio.
#[async_trait]
pub trait ClientConnector: Send + Sync {
    async fn handshake(
        &self,
        server: &str,
        transport: StdioTransport,
    ) -> Result<Arc<dyn ProtocolClient>, ToolkitError>;
}
