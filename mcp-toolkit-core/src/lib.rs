//! Exposes a stdio MCP tool server to an agent framework as a set of callable tools.
//!
//! A [`Toolkit`] owns one subprocess-backed [`Connection`]. Initializing it spawns the
//! server, lists its tools and wraps each one as an [`McpTool`]. Every live toolkit is
//! tracked by the process-wide [`ActiveToolkits`] registry so that a
//! [`ShutdownCoordinator`] can tear all of them down on SIGINT/SIGTERM.

pub mod application;
pub mod config;
pub mod constants;

pub use application::{lifecycle, tooling};
pub use config::{AppConfig, ConfigError, ServerConfig};
pub use lifecycle::{ActiveToolkits, ShutdownCoordinator};
pub use tooling::{
    CallableTool, ClientConnector, Connection, ConnectionState, ErrorKind, JsonRpcConnector,
    LaunchSpec, McpTool, ProtocolClient, ToolDescriptor, Toolkit, ToolkitError, ToolkitState,
};
