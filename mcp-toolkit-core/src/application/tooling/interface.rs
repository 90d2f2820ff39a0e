use async_trait::async_trait;
use serde_json::Value;

/// What an agent framework needs from a tool: identity, argument shape and a
/// call that always yields text.
#[async_trait]
pub trait CallableTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn argument_schema(&self) -> Value;

    /// Run the tool. Failures come back as descriptive text, never as an error.
    async fn invoke(&self, arguments: Value) -> String;
}
