// Tool runtime types
//
// Design Decision: Tools are identified by name (string) for extensibility.
// Tool execution happens via the ToolRegistry which looks up tools by name.

use serde::{Deserialize, Serialize};

/// Declared shape of a tool, advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (used by the model and for registry lookup)
    pub name: String,
    /// Tool description for the model
    pub description: String,
    /// JSON schema for tool arguments
    pub parameters: serde_json::Value,
}

/// Tool call declared by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name to execute
    pub name: String,
    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

/// Outcome status of a tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolStatus::Success => write!(f, "success"),
            ToolStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of one tool invocation
///
/// Failure is encoded in `status`, never by omission: every dispatched call
/// produces exactly one result. On failure `result` holds the error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool call ID this result corresponds to
    pub tool_call_id: String,
    /// Invocation status
    pub status: ToolStatus,
    /// Result payload (error message string on failure)
    pub result: serde_json::Value,
    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: u64,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(
        tool_call_id: impl Into<String>,
        result: serde_json::Value,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            status: ToolStatus::Success,
            result,
            execution_time_ms,
        }
    }

    /// Create a failed result carrying an error message
    pub fn error(
        tool_call_id: impl Into<String>,
        message: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            status: ToolStatus::Error,
            result: serde_json::Value::String(message.into()),
            execution_time_ms,
        }
    }

    /// Check whether the invocation succeeded
    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_serialization() {
        let tool_call = ToolCall {
            id: "call_123".to_string(),
            name: "list_dir".to_string(),
            arguments: serde_json::json!({"path": "."}),
        };

        let json = serde_json::to_string(&tool_call).unwrap();
        let parsed: ToolCall = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, tool_call.id);
        assert_eq!(parsed.name, tool_call.name);
    }

    #[test]
    fn test_tool_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ToolStatus::Success).unwrap(),
            "\"success\""
        );
        assert_eq!(
            serde_json::to_string(&ToolStatus::Error).unwrap(),
            "\"error\""
        );
    }

    #[test]
    fn test_tool_result_error_carries_message() {
        let result = ToolResult::error("call_1", "tool 'nope' does not exist", 0);
        assert!(!result.is_success());
        assert_eq!(
            result.result,
            serde_json::Value::String("tool 'nope' does not exist".to_string())
        );
    }
}
