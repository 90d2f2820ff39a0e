mod adapter;
mod connection;
mod descriptor;
mod error;
mod interface;
mod launch;
pub mod normalize;
mod process;
mod protocol;
mod rpc;
mod toolkit;

pub use adapter::McpTool;
pub use connection::{CloseOutcome, Connection, ConnectionState};
pub use descriptor::{ArgumentSchema, ToolDescriptor};
pub use error::{ErrorKind, ToolkitError};
pub use interface::CallableTool;
pub use launch::{HostPlatform, LaunchSpec, merge_env, resolve_program};
pub use process::Termination;
pub use protocol::{ClientConnector, ListedTool, ProtocolClient, StdioTransport};
pub use rpc::{JsonRpcClient, JsonRpcConnector};
pub use toolkit::{Toolkit, ToolkitBuilder, ToolkitId, ToolkitState};
pub(crate) use toolkit::ToolkitInner;
