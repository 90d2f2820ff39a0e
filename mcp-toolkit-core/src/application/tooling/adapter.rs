use super::connection::Connection;
use super::descriptor::ToolDescriptor;
use super::interface::CallableTool;
use super::normalize::normalize_reply;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// One remote tool, callable through the connection it was listed on.
#[derive(Clone)]
pub struct McpTool {
    descriptor: Arc<ToolDescriptor>,
    connection: Arc<Connection>,
}

impl McpTool {
    pub fn new(descriptor: ToolDescriptor, connection: Arc<Connection>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            connection,
        }
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub fn server(&self) -> &str {
        self.connection.server()
    }
}

impl std::fmt::Debug for McpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpTool")
            .field("server", &self.server())
            .field("name", &self.descriptor.name)
            .finish()
    }
}

#[async_trait]
impl CallableTool for McpTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn argument_schema(&self) -> Value {
        self.descriptor.schema.to_json()
    }

    async fn invoke(&self, arguments: Value) -> String {
        let tool = self.name();
        match self.connection.call_tool(tool, arguments).await {
            Ok(reply) => {
                debug!(server = %self.server(), tool, "MCP tool call succeeded");
                normalize_reply(&reply)
            }
            Err(err) => {
                warn!(server = %self.server(), tool, %err, "MCP tool call failed");
                format!("Error calling tool '{tool}': {err}")
            }
        }
    }
}
