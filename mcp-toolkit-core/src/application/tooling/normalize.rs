//! Turns a `tools/call` reply into the string handed back to the agent.
//!
//! Servers disagree on where the payload lives, so the reply is matched against
//! [`REPLY_SHAPES`] in order and the first shape that recognises it wins. A reply
//! no shape recognises is serialized whole.

use serde_json::{Map, Value};

type Extractor = fn(&Map<String, Value>) -> Option<String>;

/// Recognised reply shapes, highest priority first.
pub const REPLY_SHAPES: &[(&str, Extractor)] = &[
    ("content", content_sequence),
    ("toolResult", tool_result),
    ("result", result),
    ("data", data),
    ("content-raw", content_raw),
];

pub fn normalize_reply(reply: &Value) -> String {
    if let Some(object) = reply.as_object() {
        for (_, extract) in REPLY_SHAPES {
            if let Some(text) = extract(object) {
                return text;
            }
        }
    }
    to_json(reply)
}

/// Name of the shape that would handle `reply`, or `None` for the whole-reply fallback.
pub fn matched_shape(reply: &Value) -> Option<&'static str> {
    let object = reply.as_object()?;
    REPLY_SHAPES
        .iter()
        .find(|(_, extract)| extract(object).is_some())
        .map(|(name, _)| *name)
}

fn content_sequence(reply: &Map<String, Value>) -> Option<String> {
    match reply.get("content") {
        Some(content @ Value::Array(items)) if !items.is_empty() => Some(to_json(content)),
        _ => None,
    }
}

fn tool_result(reply: &Map<String, Value>) -> Option<String> {
    scalar_field(reply, "toolResult")
}

fn result(reply: &Map<String, Value>) -> Option<String> {
    scalar_field(reply, "result")
}

fn data(reply: &Map<String, Value>) -> Option<String> {
    scalar_field(reply, "data")
}

fn scalar_field(reply: &Map<String, Value>, key: &str) -> Option<String> {
    match reply.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(to_json(other)),
    }
}

fn content_raw(reply: &Map<String, Value>) -> Option<String> {
    reply.get("content").map(to_json)
}

fn to_json(value: &Value) -> String {
    // Serializing a `Value` into a String cannot fail.
    serde_json::to_string(value).unwrap_or_default()
}
