//! Application constants
//!
//! Single source of truth for paths and other constants.

use std::time::Duration;

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/toolkit.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// MCP protocol revision announced during the handshake
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Package runner that needs an executable shim on Windows
pub const PACKAGE_RUNNER: &str = "npx";

/// Windows-executable variant of [`PACKAGE_RUNNER`]
pub const WINDOWS_PACKAGE_RUNNER: &str = "npx.cmd";

/// How long a child gets to exit after SIGTERM before it is force-killed
pub const TERMINATION_GRACE: Duration = Duration::from_secs(5);
