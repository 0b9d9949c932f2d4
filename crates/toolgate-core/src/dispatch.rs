// Tool dispatch
//
// The dispatcher resolves a model-declared tool call to a registered tool
// and invokes it. Dispatch is infallible from the loop's perspective: every
// outcome, including an unknown tool name, becomes a ToolResult.

use std::time::Instant;
use tracing::{debug, warn};

use crate::tool_types::{ToolCall, ToolResult};
use crate::tools::ToolRegistry;

/// Routes tool calls to registered tools
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    /// Create a dispatcher over a per-task registry
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// The underlying registry
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Name of the server that contributed a tool, if registered
    pub fn server_of(&self, tool_name: &str) -> Option<&str> {
        self.registry.server_of(tool_name)
    }

    /// Invoke a tool call, measuring wall-clock execution time.
    ///
    /// - Unknown tool names produce a failed result ("does not exist"),
    ///   never an error; the loop continues to the next round.
    /// - Tool-level and internal errors are converted by the execution
    ///   contract and never propagate.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(entry) = self.registry.get(call.name.as_str()) else {
            warn!(tool = %call.name, "Tool call for unregistered tool");
            return ToolResult::error(
                &call.id,
                format!("tool '{}' does not exist", call.name),
                0,
            );
        };

        debug!(tool = %call.name, server = %entry.server, "Dispatching tool call");

        let started = Instant::now();
        let execution = entry.tool.execute(call.arguments.clone()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        execution.into_result(&call.id, &call.name, elapsed_ms)
    }
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_types::ToolStatus;
    use crate::tools::{EchoTool, FailingTool};

    fn dispatcher() -> ToolDispatcher {
        let mut registry = ToolRegistry::new();
        registry.register("test", EchoTool);
        registry.register("test", FailingTool::with_tool_error("bad input"));
        ToolDispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let dispatcher = dispatcher();
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "echo".to_string(),
            arguments: serde_json::json!({"message": "hi"}),
        };

        let result = dispatcher.dispatch(&call).await;
        assert_eq!(result.status, ToolStatus::Success);
        assert_eq!(result.tool_call_id, "call_1");
        assert_eq!(result.result["echoed"], "hi");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let dispatcher = dispatcher();
        let call = ToolCall {
            id: "call_2".to_string(),
            name: "nonexistent_tool".to_string(),
            arguments: serde_json::json!({}),
        };

        let result = dispatcher.dispatch(&call).await;
        assert_eq!(result.status, ToolStatus::Error);
        assert!(result
            .result
            .as_str()
            .unwrap()
            .contains("does not exist"));
    }

    #[tokio::test]
    async fn test_dispatch_tool_error_never_propagates() {
        let dispatcher = dispatcher();
        let call = ToolCall {
            id: "call_3".to_string(),
            name: "failing_tool".to_string(),
            arguments: serde_json::json!({}),
        };

        let result = dispatcher.dispatch(&call).await;
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(
            result.result,
            serde_json::Value::String("bad input".to_string())
        );
    }
}
