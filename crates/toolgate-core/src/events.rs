// Task events for streaming
//
// TaskEvent is the discriminated, timestamped record delivered incrementally
// to the caller while a task runs. Serialized shape is
// `{ "type": ..., "timestamp": ..., "data": {...} }` with type one of
// start | tool_start | tool_result | complete | error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool_types::ToolStatus;
use crate::usage::TaskUsage;

/// Why the loop stopped.
///
/// `complete` events carry `done`, `round_limit` or `tool_budget`; the
/// failure-path reasons appear only in the task report alongside a
/// terminal `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Model responded without tool calls; the response is the final answer
    Done,
    /// Round limit reached without a final answer
    RoundLimit,
    /// Tool invocation budget exhausted mid-task
    ToolBudget,
    /// Model generation failed and aborted the loop
    Error,
    /// Task was cancelled (explicitly or by consumer disconnect)
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Done => write!(f, "done"),
            StopReason::RoundLimit => write!(f, "round_limit"),
            StopReason::ToolBudget => write!(f, "tool_budget"),
            StopReason::Error => write!(f, "error"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Payload of a `start` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartData {
    pub task_id: Uuid,
    pub task: String,
    pub model: String,
    pub servers: Vec<String>,
}

/// Payload of a `tool_start` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStartData {
    pub task_id: Uuid,
    pub step_number: usize,
    pub server_name: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Payload of a `tool_result` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultData {
    pub task_id: Uuid,
    pub step_number: usize,
    pub server_name: String,
    pub tool_name: String,
    pub status: ToolStatus,
    pub result: serde_json::Value,
    pub execution_time_ms: u64,
}

/// Payload of a `complete` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteData {
    pub task_id: Uuid,
    pub success: bool,
    pub stop_reason: StopReason,
    pub result: String,
    pub total_steps: usize,
    pub total_execution_time_ms: u64,
    pub usage: TaskUsage,
}

/// Payload of an `error` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub task_id: Uuid,
    pub message: String,
    pub error_type: String,
}

/// Events emitted during task execution, in FIFO order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Task execution started
    Start {
        timestamp: DateTime<Utc>,
        data: StartData,
    },

    /// A tool invocation began
    ToolStart {
        timestamp: DateTime<Utc>,
        data: ToolStartData,
    },

    /// A tool invocation finished (success or failure)
    ToolResult {
        timestamp: DateTime<Utc>,
        data: ToolResultData,
    },

    /// Task finished; terminal event on the success path
    Complete {
        timestamp: DateTime<Utc>,
        data: CompleteData,
    },

    /// Task aborted; terminal event on the failure path
    Error {
        timestamp: DateTime<Utc>,
        data: ErrorData,
    },
}

impl TaskEvent {
    /// Create a start event
    pub fn start(
        task_id: Uuid,
        task: impl Into<String>,
        model: impl Into<String>,
        servers: Vec<String>,
    ) -> Self {
        TaskEvent::Start {
            timestamp: Utc::now(),
            data: StartData {
                task_id,
                task: task.into(),
                model: model.into(),
                servers,
            },
        }
    }

    /// Create a tool_start event
    pub fn tool_start(
        task_id: Uuid,
        step_number: usize,
        server_name: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        TaskEvent::ToolStart {
            timestamp: Utc::now(),
            data: ToolStartData {
                task_id,
                step_number,
                server_name: server_name.into(),
                tool_name: tool_name.into(),
                arguments,
            },
        }
    }

    /// Create a tool_result event
    #[allow(clippy::too_many_arguments)]
    pub fn tool_result(
        task_id: Uuid,
        step_number: usize,
        server_name: impl Into<String>,
        tool_name: impl Into<String>,
        status: ToolStatus,
        result: serde_json::Value,
        execution_time_ms: u64,
    ) -> Self {
        TaskEvent::ToolResult {
            timestamp: Utc::now(),
            data: ToolResultData {
                task_id,
                step_number,
                server_name: server_name.into(),
                tool_name: tool_name.into(),
                status,
                result,
                execution_time_ms,
            },
        }
    }

    /// Create a complete event
    pub fn complete(
        task_id: Uuid,
        success: bool,
        stop_reason: StopReason,
        result: impl Into<String>,
        total_steps: usize,
        total_execution_time_ms: u64,
        usage: TaskUsage,
    ) -> Self {
        TaskEvent::Complete {
            timestamp: Utc::now(),
            data: CompleteData {
                task_id,
                success,
                stop_reason,
                result: result.into(),
                total_steps,
                total_execution_time_ms,
                usage,
            },
        }
    }

    /// Create an error event
    pub fn error(
        task_id: Uuid,
        message: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        TaskEvent::Error {
            timestamp: Utc::now(),
            data: ErrorData {
                task_id,
                message: message.into(),
                error_type: error_type.into(),
            },
        }
    }

    /// Event type tag ("start", "tool_start", ...)
    pub fn kind(&self) -> &'static str {
        match self {
            TaskEvent::Start { .. } => "start",
            TaskEvent::ToolStart { .. } => "tool_start",
            TaskEvent::ToolResult { .. } => "tool_result",
            TaskEvent::Complete { .. } => "complete",
            TaskEvent::Error { .. } => "error",
        }
    }

    /// The task this event belongs to
    pub fn task_id(&self) -> Uuid {
        match self {
            TaskEvent::Start { data, .. } => data.task_id,
            TaskEvent::ToolStart { data, .. } => data.task_id,
            TaskEvent::ToolResult { data, .. } => data.task_id,
            TaskEvent::Complete { data, .. } => data.task_id,
            TaskEvent::Error { data, .. } => data.task_id,
        }
    }

    /// True for complete and error events
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskEvent::Complete { .. } | TaskEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let task_id = Uuid::now_v7();
        let event = TaskEvent::tool_start(
            task_id,
            1,
            "filesystem",
            "list_dir",
            serde_json::json!({"path": "."}),
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "tool_start");
        assert!(value["timestamp"].is_string());
        assert_eq!(value["data"]["step_number"], 1);
        assert_eq!(value["data"]["tool_name"], "list_dir");
    }

    #[test]
    fn test_kind_and_terminal() {
        let task_id = Uuid::now_v7();
        let start = TaskEvent::start(task_id, "t", "gpt-4o", vec![]);
        let error = TaskEvent::error(task_id, "boom", "model");

        assert_eq!(start.kind(), "start");
        assert!(!start.is_terminal());
        assert_eq!(error.kind(), "error");
        assert!(error.is_terminal());
        assert_eq!(error.task_id(), task_id);
    }

    #[test]
    fn test_stop_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StopReason::ToolBudget).unwrap(),
            "\"tool_budget\""
        );
        assert_eq!(StopReason::RoundLimit.to_string(), "round_limit");
    }
}
