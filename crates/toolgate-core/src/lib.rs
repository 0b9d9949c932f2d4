// Toolgate Core
//
// This crate provides the streaming tool-call orchestration loop: a task
// runner that drives a model through repeated rounds of
// (generate → detect tool calls → execute tools → feed results back) while
// emitting real-time progress events over a bounded channel.
//
// Key design decisions:
// - Collaborators are traits (ModelDriver, EventEmitter, Tool) injected at
//   construction; no global registries or singletons
// - One invocation contract for tools: async execute over flat JSON arguments
// - Tool-level failures never abort the loop; model failures always do
// - Cancellation is a cooperative token checked between rounds and dispatches
// - The event channel is a bounded SPSC queue drained by a companion stream

pub mod cancel;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod events;
pub mod message;
pub mod report;
pub mod runner;
pub mod servers;
pub mod tool_types;
pub mod tools;
pub mod usage;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use channel::{
    event_channel, ChannelEventEmitter, EventEmitter, EventStream, NullEmitter,
    DEFAULT_EVENT_CAPACITY,
};
pub use config::TaskConfig;
pub use dispatch::ToolDispatcher;
pub use driver::{
    CompletionMetadata, ModelCallConfig, ModelDriver, ModelEvent, ModelMessage, ModelResponse,
    ModelRole, ModelStream,
};
pub use error::{Result, TaskError};
pub use events::{StopReason, TaskEvent};
pub use message::{Message, MessageContent, MessageRole};
pub use report::{StepRecord, TaskReport};
pub use runner::{TaskHandle, TaskRequest, TaskRunner};
pub use servers::{build_toolset, ServerRegistry, TaskToolset, ToolServer};
pub use tool_types::{ToolCall, ToolDefinition, ToolResult, ToolStatus};
pub use tools::{EchoTool, FailingTool, RegisteredTool, Tool, ToolExecution, ToolRegistry};
pub use usage::{ModelCallUsage, TaskUsage, TokenTotals, UsageAggregator};
