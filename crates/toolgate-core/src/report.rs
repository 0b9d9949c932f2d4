// Terminal task report
//
// Created once at loop termination and immutable thereafter. This is the
// non-streaming result surface; streaming callers observe the same data as
// the terminal complete/error event.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::StopReason;
use crate::tool_types::ToolStatus;
use crate::usage::TaskUsage;

/// One executed tool invocation, in step order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_number: usize,
    pub server_name: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub result: serde_json::Value,
    pub status: ToolStatus,
    pub execution_time_ms: u64,
}

/// Terminal summary of one task execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    /// Task identifier
    pub task_id: Uuid,
    /// Whether the task reached a final answer
    pub success: bool,
    /// Why the loop stopped
    pub stop_reason: StopReason,
    /// Final textual result (last assistant text, possibly empty)
    pub result: String,
    /// Executed steps in order
    pub steps: Vec<StepRecord>,
    /// Human-readable execution summary
    pub summary: String,
    /// Rounds of model generation executed
    pub rounds: usize,
    /// Total wall-clock time in milliseconds
    pub total_execution_time_ms: u64,
    /// Aggregate token usage
    pub usage: TaskUsage,
}

impl TaskReport {
    /// Build a report, generating the summary from the outcome
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_id: Uuid,
        success: bool,
        stop_reason: StopReason,
        result: String,
        steps: Vec<StepRecord>,
        rounds: usize,
        total_execution_time_ms: u64,
        usage: TaskUsage,
    ) -> Self {
        let summary = summarize(success, stop_reason, &steps, rounds, &usage);
        Self {
            task_id,
            success,
            stop_reason,
            result,
            steps,
            summary,
            rounds,
            total_execution_time_ms,
            usage,
        }
    }

    /// Number of executed steps
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }
}

fn summarize(
    success: bool,
    stop_reason: StopReason,
    steps: &[StepRecord],
    rounds: usize,
    usage: &TaskUsage,
) -> String {
    let failed = steps.iter().filter(|s| s.status == ToolStatus::Error).count();
    let mut summary = format!(
        "{} {} tool call(s) across {} round(s)",
        if success { "Completed" } else { "Stopped after" },
        steps.len(),
        rounds,
    );
    if failed > 0 {
        summary.push_str(&format!(", {} failed", failed));
    }
    let tokens = usage.total_tokens();
    if tokens > 0 {
        summary.push_str(&format!(", {} tokens used", tokens));
    }
    match stop_reason {
        StopReason::Done => {}
        StopReason::RoundLimit => summary.push_str("; round limit reached"),
        StopReason::ToolBudget => summary.push_str("; tool call budget exhausted"),
        StopReason::Error => summary.push_str("; aborted by a model error"),
        StopReason::Cancelled => summary.push_str("; cancelled"),
    }
    summary
}
