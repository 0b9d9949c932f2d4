// In-memory implementations for examples and testing
//
// These keep all state in memory, making them a good fit for unit tests
// and quick prototyping without a live model endpoint.

use async_trait::async_trait;
use futures::stream;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::channel::EventEmitter;
use crate::driver::{
    CompletionMetadata, ModelCallConfig, ModelDriver, ModelEvent, ModelMessage, ModelStream,
};
use crate::error::{Result, TaskError};
use crate::events::TaskEvent;
use crate::tool_types::ToolCall;

// ============================================================================
// MockModelDriver - Returns scripted responses
// ============================================================================

/// One scripted model reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Text-only response (ends the loop)
    Text(String),
    /// Response declaring tool calls
    WithTools(String, Vec<ToolCall>),
    /// Simulated generation failure
    Failure(String),
}

impl MockReply {
    /// Create a text-only reply
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    /// Create a reply with tool calls
    pub fn with_tools(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        MockReply::WithTools(text.into(), tool_calls)
    }

    /// Create a simulated failure
    pub fn failure(message: impl Into<String>) -> Self {
        MockReply::Failure(message.into())
    }
}

/// Mock model driver for testing
///
/// Returns scripted replies in sequence and logs every call.
#[derive(Debug, Default)]
pub struct MockModelDriver {
    replies: Arc<RwLock<Vec<MockReply>>>,
    call_index: Arc<RwLock<usize>>,
    call_log: Arc<RwLock<Vec<Vec<ModelMessage>>>>,
    /// Usage metadata attached to each reply (best-effort, may be None)
    usage: Arc<RwLock<Option<CompletionMetadata>>>,
}

impl MockModelDriver {
    /// Create a new mock driver with no scripted replies
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock driver with scripted replies
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(RwLock::new(replies)),
            ..Default::default()
        }
    }

    /// Append a reply to the script
    pub async fn push_reply(&self, reply: MockReply) {
        self.replies.write().await.push(reply);
    }

    /// Replace the whole script
    pub async fn set_replies(&self, replies: Vec<MockReply>) {
        *self.replies.write().await = replies;
        *self.call_index.write().await = 0;
    }

    /// Attach usage metadata to every subsequent reply
    pub async fn set_usage(&self, metadata: CompletionMetadata) {
        *self.usage.write().await = Some(metadata);
    }

    /// Messages from every call made so far
    pub async fn calls(&self) -> Vec<Vec<ModelMessage>> {
        self.call_log.read().await.clone()
    }

    /// Number of calls made so far
    pub async fn call_count(&self) -> usize {
        self.call_log.read().await.len()
    }
}

#[async_trait]
impl ModelDriver for MockModelDriver {
    async fn generate_stream(
        &self,
        messages: Vec<ModelMessage>,
        config: &ModelCallConfig,
    ) -> Result<ModelStream> {
        self.call_log.write().await.push(messages);

        let mut index = self.call_index.write().await;
        let replies = self.replies.read().await;
        let reply = replies
            .get(*index)
            .cloned()
            .unwrap_or_else(|| MockReply::text("Mock response (script exhausted)"));
        *index += 1;
        drop(index);
        drop(replies);

        let metadata = self.usage.read().await.clone().unwrap_or_else(|| {
            CompletionMetadata {
                model: Some(config.model.clone()),
                ..Default::default()
            }
        });

        let events: Vec<Result<ModelEvent>> = match reply {
            MockReply::Text(text) => vec![
                Ok(ModelEvent::TextDelta(text)),
                Ok(ModelEvent::Done(metadata)),
            ],
            MockReply::WithTools(text, tool_calls) => vec![
                Ok(ModelEvent::TextDelta(text)),
                Ok(ModelEvent::ToolCalls(tool_calls)),
                Ok(ModelEvent::Done(metadata)),
            ],
            MockReply::Failure(message) => return Err(TaskError::model(message)),
        };

        Ok(Box::pin(stream::iter(events)))
    }
}

// ============================================================================
// CollectingEmitter - Collects events in memory
// ============================================================================

/// Emitter that collects events in memory for assertions
#[derive(Debug, Default, Clone)]
pub struct CollectingEmitter {
    events: Arc<RwLock<Vec<TaskEvent>>>,
}

impl CollectingEmitter {
    /// Create a new collecting emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected events, in emission order
    pub async fn events(&self) -> Vec<TaskEvent> {
        self.events.read().await.clone()
    }

    /// Event type tags, in emission order
    pub async fn kinds(&self) -> Vec<&'static str> {
        self.events.read().await.iter().map(|e| e.kind()).collect()
    }
}

#[async_trait]
impl EventEmitter for CollectingEmitter {
    async fn emit(&self, event: TaskEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ModelRole;

    #[tokio::test]
    async fn test_mock_driver_scripted_replies() {
        let driver = MockModelDriver::new();
        driver.push_reply(MockReply::text("hello")).await;

        let config = ModelCallConfig {
            model: "mock".to_string(),
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
        };

        let response = driver
            .generate(
                vec![ModelMessage::text(ModelRole::User, "hi")],
                &config,
            )
            .await
            .unwrap();

        assert_eq!(response.text, "hello");
        assert!(!response.has_tool_calls());
        assert_eq!(driver.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_driver_failure() {
        let driver = MockModelDriver::new();
        driver
            .push_reply(MockReply::failure("connection reset"))
            .await;

        let config = ModelCallConfig {
            model: "mock".to_string(),
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
        };

        let err = driver.generate(Vec::new(), &config).await.unwrap_err();
        assert!(matches!(err, TaskError::Model(_)));
    }

    #[tokio::test]
    async fn test_collecting_emitter_preserves_order() {
        let emitter = CollectingEmitter::new();
        let task_id = uuid::Uuid::now_v7();

        emitter
            .emit(TaskEvent::start(task_id, "t", "mock", vec![]))
            .await
            .unwrap();
        emitter
            .emit(TaskEvent::error(task_id, "boom", "model"))
            .await
            .unwrap();

        assert_eq!(emitter.kinds().await, vec!["start", "error"]);
    }
}
