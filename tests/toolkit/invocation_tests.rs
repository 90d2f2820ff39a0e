// Tool invocation tests - reply normalization and error text through a live server

use futures::future::join_all;
use mcp_toolkit_core::{ActiveToolkits, CallableTool, McpTool, ServerConfig, Toolkit};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

async fn ready_toolkit(config: ServerConfig) -> Toolkit {
    let toolkit = Toolkit::builder(config)
        .registry(Arc::new(ActiveToolkits::new()))
        .termination_grace(Duration::from_secs(2))
        .build();
    toolkit.initialize().await.expect("initialize");
    toolkit
}

fn fake_server() -> ServerConfig {
    ServerConfig::new("fake", env!("CARGO_BIN_EXE_fake-tool-server"))
}

fn tool(toolkit: &Toolkit, name: &str) -> McpTool {
    toolkit.tool(name).unwrap_or_else(|| panic!("tool {name} listed"))
}

async fn invoke(tool: &McpTool, arguments: Value) -> String {
    timeout(CALL_TIMEOUT, tool.invoke(arguments))
        .await
        .expect("invoke finished in time")
}

#[tokio::test]
async fn content_reply_is_returned_as_serialized_sequence() {
    let toolkit = ready_toolkit(fake_server()).await;

    let reply = invoke(&tool(&toolkit, "echo"), json!({ "text": "hi" })).await;

    assert_eq!(reply, r#"[{"type":"text","text":"hi"}]"#);
    toolkit.cleanup().await;
}

#[tokio::test]
async fn reply_shapes_are_normalized() {
    let toolkit = ready_toolkit(fake_server()).await;
    let shape = tool(&toolkit, "shape");

    let cases = [
        ("toolResult", "done"),
        ("result", "42"),
        ("data", r#"{"rows":[1,2]}"#),
        ("empty", "[]"),
        ("other", r#"{"status":"ok"}"#),
    ];
    for (name, expected) in cases {
        let reply = invoke(&shape, json!({ "shape": name })).await;
        assert_eq!(reply, expected, "shape {name}");
    }
    toolkit.cleanup().await;
}

#[tokio::test]
async fn configured_env_is_layered_over_inherited_env() {
    let toolkit = ready_toolkit(fake_server().with_env("FAKE_GREETING", "hello")).await;
    let env = tool(&toolkit, "env");

    let greeting = invoke(&env, json!({ "name": "FAKE_GREETING" })).await;
    assert_eq!(greeting, r#"[{"type":"text","text":"hello"}]"#);

    let path = invoke(&env, json!({ "name": "PATH" })).await;
    assert_ne!(path, r#"[{"type":"text","text":""}]"#, "PATH was not inherited");
    toolkit.cleanup().await;
}

#[tokio::test]
async fn remote_error_becomes_descriptive_text() {
    let toolkit = ready_toolkit(fake_server()).await;

    let reply = invoke(&tool(&toolkit, "fail"), json!({})).await;

    assert!(reply.starts_with("Error calling tool 'fail':"), "{reply}");
    assert!(reply.contains("boom"), "{reply}");
    toolkit.cleanup().await;
}

#[tokio::test]
async fn server_crash_mid_call_becomes_descriptive_text() {
    let toolkit = ready_toolkit(fake_server()).await;

    let reply = invoke(&tool(&toolkit, "crash"), json!({})).await;

    assert!(reply.starts_with("Error calling tool 'crash':"), "{reply}");
    assert!(reply.contains("terminated"), "{reply}");
    assert!(toolkit.cleanup().await);
}

#[tokio::test]
async fn invoking_after_cleanup_reports_closed_connection() {
    let toolkit = ready_toolkit(fake_server()).await;
    let echo = tool(&toolkit, "echo");
    toolkit.cleanup().await;

    let reply = invoke(&echo, json!({ "text": "late" })).await;

    assert!(reply.starts_with("Error calling tool 'echo':"), "{reply}");
    assert!(reply.contains("closed"), "{reply}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_are_matched_to_their_replies() {
    let toolkit = ready_toolkit(fake_server()).await;
    let echo = tool(&toolkit, "echo");

    let calls = (0..16).map(|index| {
        let echo = echo.clone();
        async move { (index, invoke(&echo, json!({ "text": format!("call-{index}") })).await) }
    });
    for (index, reply) in join_all(calls).await {
        assert_eq!(reply, format!(r#"[{{"type":"text","text":"call-{index}"}}]"#));
    }
    toolkit.cleanup().await;
}

#[tokio::test]
async fn pending_call_is_released_by_cleanup() {
    let toolkit = ready_toolkit(fake_server()).await;
    let hang = tool(&toolkit, "hang");

    let call = tokio::spawn(async move { hang.invoke(json!({})).await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    toolkit.cleanup().await;

    let reply = timeout(CALL_TIMEOUT, call)
        .await
        .expect("call released")
        .expect("call task");
    assert!(reply.starts_with("Error calling tool 'hang':"), "{reply}");
}

#[tokio::test]
async fn callables_expose_the_permissive_argument_schema() {
    let toolkit = ready_toolkit(fake_server()).await;

    let callables = toolkit.callables();
    let echo = callables
        .iter()
        .find(|tool| tool.name() == "echo")
        .expect("echo callable");

    assert_eq!(echo.description(), "Echo text back");
    assert_eq!(echo.argument_schema()["type"], "object");
    assert!(echo.argument_schema()["properties"].get("text").is_some());
    toolkit.cleanup().await;
}
