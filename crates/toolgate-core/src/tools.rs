// Tool abstraction
//
// Tools are defined via the `Tool` trait and registered with a
// `ToolRegistry` for use by the dispatcher. There is exactly one invocation
// contract: async `execute` over a flat JSON-object argument mapping.
//
// Design decisions:
// - Error handling distinguishes between model-visible errors and internal errors
// - Internal errors are logged but not exposed to the model
// - The registry remembers which tool server contributed each tool

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use crate::tool_types::{ToolDefinition, ToolResult};

// ============================================================================
// Tool Execution Outcome - Error Handling Contract
// ============================================================================

/// Outcome of a tool execution.
///
/// - `Success`: tool executed, result is returned to the model
/// - `ToolError`: tool-level error that is safe to show to the model
///   (e.g., "path escapes the root", "file not found")
/// - `InternalError`: system-level error that is NOT exposed to the model;
///   the details are logged and replaced with a generic message
#[derive(Debug)]
pub enum ToolExecution {
    /// Successful execution with a JSON result
    Success(Value),

    /// Tool-level error that is safe to show to the model
    ToolError(String),

    /// Internal/system error that is hidden from the model
    InternalError(String),
}

impl ToolExecution {
    /// Create a successful outcome
    pub fn success(value: impl Into<Value>) -> Self {
        ToolExecution::Success(value.into())
    }

    /// Create a tool-level error (safe to show to the model)
    pub fn tool_error(message: impl Into<String>) -> Self {
        ToolExecution::ToolError(message.into())
    }

    /// Create an internal error (hidden from the model)
    pub fn internal_error(message: impl Into<String>) -> Self {
        ToolExecution::InternalError(message.into())
    }

    /// Check if this is a successful outcome
    pub fn is_success(&self) -> bool {
        matches!(self, ToolExecution::Success(_))
    }

    /// Convert to a ToolResult for the loop.
    ///
    /// Internal errors are logged in full and surfaced to the model as a
    /// generic message so system details never leak into the conversation.
    pub fn into_result(
        self,
        tool_call_id: &str,
        tool_name: &str,
        execution_time_ms: u64,
    ) -> ToolResult {
        match self {
            ToolExecution::Success(value) => {
                ToolResult::success(tool_call_id, value, execution_time_ms)
            }
            ToolExecution::ToolError(message) => {
                ToolResult::error(tool_call_id, message, execution_time_ms)
            }
            ToolExecution::InternalError(message) => {
                error!(
                    tool_name = %tool_name,
                    tool_call_id = %tool_call_id,
                    error = %message,
                    "Tool internal error (details hidden from model)"
                );
                ToolResult::error(
                    tool_call_id,
                    "An internal error occurred while executing the tool",
                    execution_time_ms,
                )
            }
        }
    }
}

// ============================================================================
// Tool Trait
// ============================================================================

/// Trait for implementing tools that can be invoked by the task loop.
///
/// This is the single invocation contract: every tool takes a flat JSON
/// object of arguments conforming to `parameters_schema()` and returns a
/// `ToolExecution`.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// struct Uppercase;
///
/// #[async_trait]
/// impl Tool for Uppercase {
///     fn name(&self) -> &str {
///         "uppercase"
///     }
///
///     fn description(&self) -> &str {
///         "Uppercase the provided text"
///     }
///
///     fn parameters_schema(&self) -> Value {
///         json!({
///             "type": "object",
///             "properties": {
///                 "text": { "type": "string" }
///             },
///             "required": ["text"]
///         })
///     }
///
///     async fn execute(&self, arguments: Value) -> ToolExecution {
///         let text = arguments.get("text").and_then(|v| v.as_str()).unwrap_or("");
///         ToolExecution::success(json!({ "text": text.to_uppercase() }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's unique name.
    ///
    /// Used by the model to invoke the tool; must be unique within a
    /// registry.
    fn name(&self) -> &str;

    /// Returns a description of what the tool does, provided to the model.
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's arguments.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Value) -> ToolExecution;

    /// Convert this tool to a definition advertised to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

// ============================================================================
// ToolRegistry
// ============================================================================

/// A tool entry together with the name of the server that contributed it
#[derive(Clone)]
pub struct RegisteredTool {
    /// Name of the contributing tool server
    pub server: String,
    /// The tool implementation
    pub tool: Arc<dyn Tool>,
}

/// Registry mapping tool names to implementations.
///
/// Built once per task from the task's requested tool servers and read-only
/// for the duration of that task. Lookup is exact-match by name; unknown
/// names are a reported error at dispatch time, not a fatal one.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool under the given server name.
    ///
    /// If a tool with the same name already exists, it is replaced.
    pub fn register(&mut self, server: impl Into<String>, tool: impl Tool + 'static) {
        self.register_arc(server, Arc::new(tool));
    }

    /// Register a boxed tool under the given server name
    pub fn register_boxed(&mut self, server: impl Into<String>, tool: Box<dyn Tool>) {
        self.register_arc(server, Arc::from(tool));
    }

    /// Register an Arc-wrapped tool under the given server name
    pub fn register_arc(&mut self, server: impl Into<String>, tool: Arc<dyn Tool>) {
        self.tools.insert(
            tool.name().to_string(),
            RegisteredTool {
                server: server.into(),
                tool,
            },
        );
    }

    /// Look up a tool entry by name
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Name of the server that contributed a tool, if registered
    pub fn server_of(&self, name: &str) -> Option<&str> {
        self.tools.get(name).map(|entry| entry.server.as_str())
    }

    /// Check if a tool is registered
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Definitions for every registered tool, advertised to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|entry| entry.tool.to_definition())
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

// ============================================================================
// Built-in Tools (testing)
// ============================================================================

/// A tool that echoes back its arguments (useful for testing)
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo back the provided message. Useful for testing tool execution."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let message = arguments
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        ToolExecution::success(serde_json::json!({
            "echoed": message,
            "length": message.len()
        }))
    }
}

/// A tool that always fails (useful for testing error handling)
pub struct FailingTool {
    error_message: String,
    use_internal_error: bool,
}

impl FailingTool {
    /// Create a failing tool with a tool-level error
    pub fn with_tool_error(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            use_internal_error: false,
        }
    }

    /// Create a failing tool with an internal error
    pub fn with_internal_error(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            use_internal_error: true,
        }
    }
}

impl Default for FailingTool {
    fn default() -> Self {
        Self::with_tool_error("Tool execution failed")
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing_tool"
    }

    fn description(&self) -> &str {
        "A tool that always fails (for testing error handling)"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    async fn execute(&self, _arguments: Value) -> ToolExecution {
        if self.use_internal_error {
            ToolExecution::internal_error(&self.error_message)
        } else {
            ToolExecution::tool_error(&self.error_message)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_tool() {
        let tool = EchoTool;

        let result = tool
            .execute(serde_json::json!({"message": "Hello, world!"}))
            .await;

        if let ToolExecution::Success(value) = result {
            assert_eq!(
                value.get("echoed").unwrap().as_str().unwrap(),
                "Hello, world!"
            );
            assert_eq!(value.get("length").unwrap().as_u64().unwrap(), 13);
        } else {
            panic!("Expected success");
        }
    }

    #[tokio::test]
    async fn test_failing_tool_with_tool_error() {
        let tool = FailingTool::with_tool_error("Something went wrong");

        let result = tool.execute(serde_json::json!({})).await;

        if let ToolExecution::ToolError(msg) = result {
            assert_eq!(msg, "Something went wrong");
        } else {
            panic!("Expected tool error");
        }
    }

    #[test]
    fn test_execution_into_result() {
        // Success
        let outcome = ToolExecution::success(serde_json::json!({"value": 42}));
        let result = outcome.into_result("call_1", "test_tool", 7);
        assert!(result.is_success());
        assert_eq!(result.result["value"], 42);
        assert_eq!(result.execution_time_ms, 7);

        // Tool error keeps the message
        let outcome = ToolExecution::tool_error("Invalid input");
        let result = outcome.into_result("call_2", "test_tool", 1);
        assert!(!result.is_success());
        assert_eq!(
            result.result,
            serde_json::Value::String("Invalid input".to_string())
        );

        // Internal error is replaced with a generic message
        let outcome = ToolExecution::internal_error("secret database error");
        let result = outcome.into_result("call_3", "test_tool", 1);
        assert!(!result.is_success());
        assert_eq!(
            result.result,
            serde_json::Value::String(
                "An internal error occurred while executing the tool".to_string()
            )
        );
    }

    #[test]
    fn test_tool_registry() {
        let mut registry = ToolRegistry::new();
        registry.register("test", EchoTool);
        registry.register("test", FailingTool::default());

        assert_eq!(registry.len(), 2);
        assert!(registry.has("echo"));
        assert!(registry.has("failing_tool"));
        assert!(!registry.has("nonexistent"));
        assert_eq!(registry.server_of("echo"), Some("test"));
        assert_eq!(registry.server_of("nonexistent"), None);

        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 2);
    }
}
