// Human-readable rendering of events and reports

use toolgate_core::{TaskEvent, TaskReport};

/// One line per event
pub fn render_event(event: &TaskEvent) -> String {
    match event {
        TaskEvent::Start { data, .. } => {
            format!(
                "task {} started (model {}, servers: {})",
                data.task_id,
                data.model,
                if data.servers.is_empty() {
                    "none".to_string()
                } else {
                    data.servers.join(", ")
                }
            )
        }
        TaskEvent::ToolStart { data, .. } => {
            format!(
                "[step {}] {}/{} {}",
                data.step_number, data.server_name, data.tool_name, data.arguments
            )
        }
        TaskEvent::ToolResult { data, .. } => {
            format!(
                "[step {}] {} -> {} ({} ms)",
                data.step_number, data.tool_name, data.status, data.execution_time_ms
            )
        }
        TaskEvent::Complete { data, .. } => {
            let outcome = if data.success {
                "success".to_string()
            } else {
                data.stop_reason.to_string()
            };
            format!(
                "task {} complete: {} ({} steps, {} ms)",
                data.task_id, outcome, data.total_steps, data.total_execution_time_ms
            )
        }
        TaskEvent::Error { data, .. } => {
            format!("task {} error [{}]: {}", data.task_id, data.error_type, data.message)
        }
    }
}

/// Final report block printed after the stream ends
pub fn render_report(report: &TaskReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", report.summary));
    if !report.result.is_empty() {
        out.push_str(&format!("\n{}\n", report.result));
    }
    out
}
