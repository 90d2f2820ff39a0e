use thiserror::Error;

/// Coarse classification of [`ToolkitError`] for callers that only care about the
/// failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid launch configuration.
    Configuration,
    /// Spawn, handshake, stream or remote failure.
    Transport,
    /// Operation issued against a connection in the wrong state.
    Protocol,
    /// A listed tool could not be converted into a callable.
    Descriptor,
}

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("invalid launch configuration for MCP server '{server}': {reason}")]
    Configuration { server: String, reason: String },
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("MCP server '{server}' request cancelled")]
    Cancelled { server: String },
    #[error("MCP server '{server}' connection is {state}; cannot {operation}")]
    Protocol {
        server: String,
        state: &'static str,
        operation: &'static str,
    },
    #[error("tool '{tool}' from MCP server '{server}' is invalid: {reason}")]
    Descriptor {
        server: String,
        tool: String,
        reason: String,
    },
}

impl ToolkitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolkitError::Configuration { .. } => ErrorKind::Configuration,
            ToolkitError::Protocol { .. } => ErrorKind::Protocol,
            ToolkitError::Descriptor { .. } => ErrorKind::Descriptor,
            ToolkitError::Spawn { .. }
            | ToolkitError::Transport { .. }
            | ToolkitError::InvalidJson { .. }
            | ToolkitError::Rpc { .. }
            | ToolkitError::Terminated { .. }
            | ToolkitError::Cancelled { .. } => ErrorKind::Transport,
        }
    }

    pub fn server(&self) -> &str {
        match self {
            ToolkitError::Configuration { server, .. }
            | ToolkitError::Spawn { server, .. }
            | ToolkitError::Transport { server, .. }
            | ToolkitError::InvalidJson { server, .. }
            | ToolkitError::Rpc { server, .. }
            | ToolkitError::Terminated { server }
            | ToolkitError::Cancelled { server }
            | ToolkitError::Protocol { server, .. }
            | ToolkitError::Descriptor { server, .. } => server,
        }
    }
}
