// Conversation message types
//
// Message represents a single entry in the conversation built during one
// task execution. The conversation is owned by one loop invocation and
// discarded when the task ends; there is no persistence layer.

use crate::tool_types::{ToolCall, ToolStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message role in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message (the task)
    User,
    /// Assistant response
    Assistant,
    /// Tool execution result
    ToolResult,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::ToolResult => write!(f, "tool_result"),
        }
    }
}

/// Message content variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Text content (system/user/assistant messages)
    Text(String),

    /// Tool result content
    ToolResult {
        result: serde_json::Value,
        status: ToolStatus,
    },
}

impl MessageContent {
    /// Get text content if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to the text representation sent to the model
    pub fn to_llm_string(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::ToolResult { result, status } => {
                let payload =
                    serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string());
                match status {
                    ToolStatus::Success => payload,
                    ToolStatus::Error => format!("Tool error: {}", payload),
                }
            }
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: Uuid,

    /// Message role
    pub role: MessageRole,

    /// Message content
    pub content: MessageContent,

    /// Tool call ID (for tool_result messages, correlates with the call)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool calls requested by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Timestamp when the message was created
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
            tool_calls: None,
            created_at: Utc::now(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
            tool_calls: None,
            created_at: Utc::now(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
            tool_calls: None,
            created_at: Utc::now(),
        }
    }

    /// Create a new assistant message carrying tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
            created_at: Utc::now(),
        }
    }

    /// Create a tool result message
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        result: serde_json::Value,
        status: ToolStatus,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::ToolResult,
            content: MessageContent::ToolResult { result, status },
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
            created_at: Utc::now(),
        }
    }

    /// Get text content if this is a text message
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }

    /// Check if this message has tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|tc| !tc.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let msg = Message::user("Slice the intro out of episode.wav");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.text(), Some("Slice the intro out of episode.wav"));
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_assistant_with_tools() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "list_dir".to_string(),
            arguments: serde_json::json!({"path": "."}),
        };
        let msg = Message::assistant_with_tools("", vec![call]);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn test_tool_result_message() {
        let msg = Message::tool_result(
            "call_123",
            serde_json::json!({"entries": []}),
            ToolStatus::Success,
        );
        assert_eq!(msg.role, MessageRole::ToolResult);
        assert_eq!(msg.tool_call_id, Some("call_123".to_string()));
    }

    #[test]
    fn test_error_result_renders_with_prefix() {
        let msg = Message::tool_result(
            "call_9",
            serde_json::Value::String("tool 'nope' does not exist".to_string()),
            ToolStatus::Error,
        );
        assert!(msg.content.to_llm_string().starts_with("Tool error:"));
    }
}
