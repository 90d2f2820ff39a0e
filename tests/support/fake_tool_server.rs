//! Minimal stdio MCP server used by the integration tests.
//!
//! `FAKE_SERVER_MODE` selects the behaviour:
//! - `ok` (default): well-formed server
//! - `bad-schema`: one listed tool has no `properties`
//! - `no-handshake`: exits as soon as `initialize` arrives
//!
//! When `FAKE_SERVER_PID_FILE` is set the server writes its pid there on startup.

use serde_json::{Value, json};
use std::io::{self, BufRead, Write};

fn main() {
    let mode = std::env::var("FAKE_SERVER_MODE").unwrap_or_else(|_| "ok".to_string());
    if let Ok(path) = std::env::var("FAKE_SERVER_PID_FILE") {
        std::fs::write(path, std::process::id().to_string()).expect("write pid file");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        let Some(id) = message.get("id").cloned() else {
            continue;
        };
        let method = message["method"].as_str().unwrap_or_default();
        let params = &message["params"];

        let reply = match method {
            "initialize" if mode == "no-handshake" => std::process::exit(1),
            "initialize" => json!({
                "result": {
                    "protocolVersion": params["protocolVersion"].clone(),
                    "serverInfo": { "name": "fake-tool-server", "version": "1.0.0" },
                    "capabilities": { "tools": {} },
                    "instructions": "fake instructions"
                }
            }),
            "tools/list" => json!({ "result": { "tools": list_tools(&mode) } }),
            "tools/call" => match call_tool(params) {
                Some(reply) => reply,
                None => continue,
            },
            other => json!({
                "error": { "code": -32601, "message": format!("unknown method {other}") }
            }),
        };

        let mut response = reply;
        response["jsonrpc"] = json!("2.0");
        response["id"] = id;
        let mut text = response.to_string();
        text.push('\n');
        if stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()).is_err() {
            break;
        }
    }
}

fn list_tools(mode: &str) -> Value {
    let object = |properties: Value| json!({ "type": "object", "properties": properties });
    let mut tools = vec![
        json!({ "name": "echo", "description": "Echo text back", "inputSchema": object(json!({ "text": { "type": "string" } })) }),
        json!({ "name": "shape", "description": "Reply in a chosen shape", "inputSchema": object(json!({ "shape": {} })) }),
        json!({ "name": "env", "description": "Read an environment variable", "inputSchema": object(json!({ "name": {} })) }),
        json!({ "name": "fail", "inputSchema": object(json!({})) }),
        json!({ "name": "crash", "inputSchema": object(json!({})) }),
        json!({ "name": "hang", "inputSchema": object(json!({})) }),
    ];
    if mode == "bad-schema" {
        tools.push(json!({ "name": "broken", "inputSchema": { "type": "object" } }));
    }
    Value::Array(tools)
}

/// `None` means "never answer".
fn call_tool(params: &Value) -> Option<Value> {
    let args = &params["arguments"];
    let reply = match params["name"].as_str().unwrap_or_default() {
        "echo" => json!({
            "result": { "content": [{ "type": "text", "text": args["text"].clone() }] }
        }),
        "shape" => {
            let result = match args["shape"].as_str().unwrap_or_default() {
                "toolResult" => json!({ "toolResult": "done" }),
                "result" => json!({ "result": 42 }),
                "data" => json!({ "data": { "rows": [1, 2] } }),
                "empty" => json!({ "content": [] }),
                _ => json!({ "status": "ok" }),
            };
            json!({ "result": result })
        }
        "env" => {
            let name = args["name"].as_str().unwrap_or_default();
            let value = std::env::var(name).unwrap_or_default();
            json!({ "result": { "content": [{ "type": "text", "text": value }] } })
        }
        "fail" => json!({ "error": { "code": -32000, "message": "boom" } }),
        "crash" => std::process::exit(3),
        "hang" => return None,
        other => json!({ "error": { "code": -32602, "message": format!("unknown tool {other}") } }),
    };
    Some(reply)
}
