// Toolkit lifecycle tests - spawning, listing, cleanup against a real subprocess
//
// Every test uses its own registry so membership checks do not race with other tests.

use mcp_toolkit_core::{
    ActiveToolkits, CallableTool, ErrorKind, ServerConfig, Toolkit, ToolkitError, ToolkitState,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn fake_server(mode: &str) -> ServerConfig {
    ServerConfig::new("fake", env!("CARGO_BIN_EXE_fake-tool-server")).with_env("FAKE_SERVER_MODE", mode)
}

fn build(config: ServerConfig) -> (Toolkit, Arc<ActiveToolkits>) {
    let registry = Arc::new(ActiveToolkits::new());
    let toolkit = Toolkit::builder(config)
        .registry(Arc::clone(&registry))
        .termination_grace(Duration::from_secs(2))
        .build();
    (toolkit, registry)
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

fn read_pid(path: &Path) -> u32 {
    std::fs::read_to_string(path)
        .expect("pid file")
        .trim()
        .parse()
        .expect("numeric pid")
}

#[tokio::test]
async fn initialize_lists_tools_in_server_order() {
    let (toolkit, registry) = build(fake_server("ok"));

    toolkit.initialize().await.expect("initialize");

    assert_eq!(toolkit.state(), ToolkitState::Ready);
    assert!(registry.contains(toolkit.id()));
    assert!(toolkit.is_registered());
    let names: Vec<String> = toolkit
        .tools()
        .iter()
        .map(|tool| tool.name().to_string())
        .collect();
    assert_eq!(names, vec!["echo", "shape", "env", "fail", "crash", "hang"]);
    assert_eq!(toolkit.instructions().as_deref(), Some("fake instructions"));
    assert_eq!(toolkit.tool("fail").map(|tool| tool.description().to_string()), Some(String::new()));
    assert_eq!(toolkit.callables().len(), 6);

    toolkit.cleanup().await;
}

#[tokio::test]
async fn initialize_twice_keeps_the_same_process() {
    let (toolkit, _registry) = build(fake_server("ok"));

    toolkit.initialize().await.expect("first initialize");
    let pid = toolkit.pid().expect("pid");
    toolkit.initialize().await.expect("second initialize");

    assert_eq!(toolkit.pid(), Some(pid));
    toolkit.cleanup().await;
}

#[tokio::test]
async fn cleanup_is_idempotent() {
    let (toolkit, registry) = build(fake_server("ok"));
    toolkit.initialize().await.expect("initialize");
    let pid = toolkit.pid().expect("pid");

    assert!(toolkit.cleanup().await);
    assert!(!toolkit.cleanup().await);

    assert_eq!(toolkit.state(), ToolkitState::Idle);
    assert!(toolkit.tools().is_empty());
    assert!(toolkit.pid().is_none());
    assert!(!registry.contains(toolkit.id()));
    #[cfg(target_os = "linux")]
    assert!(!process_alive(pid));
    let _ = pid;
}

#[tokio::test]
async fn toolkit_can_be_initialized_again_after_cleanup() {
    let (toolkit, registry) = build(fake_server("ok"));
    toolkit.initialize().await.expect("initialize");
    let first_pid = toolkit.pid().expect("pid");
    toolkit.cleanup().await;

    toolkit.initialize().await.expect("re-initialize");

    assert_ne!(toolkit.pid(), Some(first_pid));
    assert!(registry.contains(toolkit.id()));
    toolkit.cleanup().await;
}

#[tokio::test]
async fn invalid_descriptor_fails_initialization_and_stops_the_server() {
    let dir = tempdir().expect("tempdir");
    let pid_file = dir.path().join("server.pid");
    let config = fake_server("bad-schema")
        .with_env("FAKE_SERVER_PID_FILE", pid_file.to_string_lossy());
    let (toolkit, registry) = build(config);

    let err = toolkit.initialize().await.expect_err("bad schema");

    assert_eq!(err.kind(), ErrorKind::Descriptor);
    assert!(matches!(err, ToolkitError::Descriptor { ref tool, .. } if tool == "broken"));
    assert!(registry.is_empty());
    assert_eq!(toolkit.state(), ToolkitState::Idle);
    assert!(toolkit.tools().is_empty());
    let pid = read_pid(&pid_file);
    #[cfg(target_os = "linux")]
    assert!(!process_alive(pid), "server {pid} still running");
    let _ = pid;
}

#[tokio::test]
async fn handshake_failure_is_a_transport_error() {
    let (toolkit, registry) = build(fake_server("no-handshake"));

    let err = toolkit.initialize().await.expect_err("no handshake");

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(registry.is_empty());
    assert_eq!(toolkit.state(), ToolkitState::Idle);
}

#[tokio::test]
async fn missing_command_is_a_configuration_error() {
    let config = ServerConfig {
        name: "no-command".to_string(),
        ..ServerConfig::default()
    };
    let (toolkit, registry) = build(config);

    let err = toolkit.initialize().await.expect_err("no command");

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(registry.is_empty());
    assert!(!toolkit.is_registered());
}

#[tokio::test]
async fn unknown_binary_is_a_spawn_error() {
    let (toolkit, registry) = build(ServerConfig::new("ghost", "/no/such/tool-server"));

    let err = toolkit.initialize().await.expect_err("spawn");

    assert!(matches!(err, ToolkitError::Spawn { .. }));
    assert!(registry.is_empty());
}
