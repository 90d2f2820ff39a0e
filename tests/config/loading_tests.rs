// Config loading tests - testing AppConfig::load error handling
//
// Tests focused on toolkit.toml loading and validation errors.

use mcp_toolkit_core::{AppConfig, ConfigError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("toolkit.toml");
    fs::write(&path, content).expect("Failed to write toolkit.toml");
    path
}

#[test]
fn returns_error_when_file_not_found() {
    let result = AppConfig::load(Some(Path::new("/nonexistent/path/toolkit.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn returns_error_on_invalid_toml() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[[servers]\nname = ");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn returns_error_when_no_servers_configured() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "# nothing here\n");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::NoServersConfigured)));
}

#[test]
fn returns_error_when_server_has_no_name() {
    let dir = tempdir().expect("tempdir");
    let content = r#"
[[servers]]
name = "files"
command = "files-server"

[[servers]]
command = "anonymous-server"
"#;
    let path = write_config(dir.path(), content);

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::MissingServerName { index: 1 })));
}

#[test]
fn returns_error_on_duplicate_server_names() {
    let dir = tempdir().expect("tempdir");
    let content = r#"
[[servers]]
name = "files"
command = "a"

[[servers]]
name = "files"
command = "b"
"#;
    let path = write_config(dir.path(), content);

    let err = AppConfig::load(Some(&path)).expect_err("duplicate");
    assert!(matches!(err, ConfigError::DuplicateServer { ref name } if name == "files"));
}

#[test]
fn loads_full_server_entry() {
    let dir = tempdir().expect("tempdir");
    let content = r#"
[[servers]]
name = "files"
command = "npx"
args = ["-y", "@modelcontextprotocol/server-filesystem", "/srv"]
workdir = "/srv"

[servers.env]
LOG_LEVEL = "debug"
"#;
    let path = write_config(dir.path(), content);

    let config = AppConfig::load(Some(&path)).expect("valid config");
    assert_eq!(config.server_names(), vec!["files"]);
    let server = config.server("files").expect("files server");
    assert_eq!(server.command.as_deref(), Some("npx"));
    assert_eq!(
        server.args,
        vec!["-y", "@modelcontextprotocol/server-filesystem", "/srv"]
    );
    assert_eq!(server.env.get("LOG_LEVEL").map(String::as_str), Some("debug"));
    assert_eq!(server.workdir.as_deref(), Some(Path::new("/srv")));
}

#[test]
fn server_without_command_is_accepted_at_load_time() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "[[servers]]\nname = \"later\"\n");

    let config = AppConfig::load(Some(&path)).expect("valid config");
    assert_eq!(config.server("later").and_then(|s| s.command.clone()), None);
}

#[test]
fn servers_keep_file_order() {
    let content = r#"
[[servers]]
name = "zeta"
command = "z"

[[servers]]
name = "alpha"
command = "a"
"#;
    let config = AppConfig::from_toml_str(content).expect("valid config");
    assert_eq!(config.server_names(), vec!["zeta", "alpha"]);
}
