use super::error::ToolkitError;
use super::protocol::ListedTool;
use serde_json::{Map, Value, json};
use std::collections::HashSet;

/// Argument shape of a remote tool. Every field accepts any JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ArgumentSchema {
    /// Accepts only `{"type": "object", "properties": {...}}` schemas.
    pub fn from_input_schema(schema: &Value) -> Result<Self, String> {
        let object = schema
            .as_object()
            .ok_or_else(|| "input schema is not a JSON object".to_string())?;
        match object.get("type").and_then(Value::as_str) {
            Some("object") => {}
            Some(other) => return Err(format!("input schema type is '{other}', expected 'object'")),
            None => return Err("input schema has no 'type'".to_string()),
        }
        let properties = object
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| "input schema has no 'properties' map".to_string())?;

        let required = object
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            properties: properties.clone(),
            required,
        })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Permissive JSON schema handed to the agent framework: same fields, no types,
    /// nothing required. [`Self::required`] keeps the server's list for callers that want it.
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, field)| {
                let mut loose = Map::new();
                if let Some(description) = field.get("description").and_then(Value::as_str) {
                    loose.insert("description".to_string(), json!(description));
                }
                (name.clone(), Value::Object(loose))
            })
            .collect();

        json!({
            "type": "object",
            "properties": properties,
        })
    }
}

/// A listed tool that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub schema: ArgumentSchema,
}

impl ToolDescriptor {
    pub fn from_listing(server: &str, listed: ListedTool) -> Result<Self, ToolkitError> {
        let invalid = |reason: String| ToolkitError::Descriptor {
            server: server.to_string(),
            tool: listed.name.clone(),
            reason,
        };

        if listed.name.trim().is_empty() {
            return Err(invalid("tool name is empty".to_string()));
        }
        let schema = listed
            .input_schema
            .as_ref()
            .ok_or_else(|| invalid("missing input schema".to_string()))
            .and_then(|schema| ArgumentSchema::from_input_schema(schema).map_err(invalid))?;

        Ok(Self {
            name: listed.name.clone(),
            description: listed.description.clone().unwrap_or_default(),
            schema,
        })
    }

    /// Converts a whole listing; one bad entry or a repeated name fails all of it.
    pub fn from_listings(
        server: &str,
        listed: Vec<ListedTool>,
    ) -> Result<Vec<Self>, ToolkitError> {
        let mut seen = HashSet::new();
        listed
            .into_iter()
            .map(|tool| {
                let descriptor = Self::from_listing(server, tool)?;
                if !seen.insert(descriptor.name.clone()) {
                    return Err(ToolkitError::Descriptor {
                        server: server.to_string(),
                        tool: descriptor.name,
                        reason: "tool name is listed more than once".to_string(),
                    });
                }
                Ok(descriptor)
            })
            .collect()
    }
}
