// Model driver abstraction
//
// This module encapsulates everything needed to interact with a hosted
// model API: the ModelDriver trait, provider-agnostic message types, and
// the streaming event type drivers emit.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::config::TaskConfig;
use crate::error::Result;
use crate::message::{Message, MessageRole};
use crate::tool_types::{ToolCall, ToolDefinition};

// ============================================================================
// ModelDriver Trait
// ============================================================================

/// Type alias for the model response stream
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelEvent>> + Send>>;

/// Events emitted while a model response streams in
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// Text delta (incremental content)
    TextDelta(String),
    /// Tool calls declared by the model
    ToolCalls(Vec<ToolCall>),
    /// Streaming completed
    Done(CompletionMetadata),
    /// Error during streaming
    Error(String),
}

/// Metadata about a completed generation
#[derive(Debug, Clone, Default)]
pub struct CompletionMetadata {
    /// Tokens consumed by the prompt
    pub prompt_tokens: Option<u32>,
    /// Tokens generated in the response
    pub completion_tokens: Option<u32>,
    /// Total tokens used
    pub total_tokens: Option<u32>,
    /// Model that served the request
    pub model: Option<String>,
    /// Finish reason reported by the provider
    pub finish_reason: Option<String>,
}

/// Trait for model drivers
///
/// Implementations handle provider-specific API calls and response parsing.
#[async_trait]
pub trait ModelDriver: Send + Sync {
    /// Call the model with a streaming response
    async fn generate_stream(
        &self,
        messages: Vec<ModelMessage>,
        config: &ModelCallConfig,
    ) -> Result<ModelStream>;

    /// Call the model and fold the stream into one response
    async fn generate(
        &self,
        messages: Vec<ModelMessage>,
        config: &ModelCallConfig,
    ) -> Result<ModelResponse> {
        use futures::StreamExt;

        let mut stream = self.generate_stream(messages, config).await?;
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut metadata = CompletionMetadata::default();

        while let Some(event) = stream.next().await {
            match event? {
                ModelEvent::TextDelta(delta) => text.push_str(&delta),
                ModelEvent::ToolCalls(calls) => tool_calls = calls,
                ModelEvent::Done(meta) => metadata = meta,
                ModelEvent::Error(err) => return Err(crate::error::TaskError::model(err)),
            }
        }

        Ok(ModelResponse {
            text,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            metadata,
        })
    }
}

/// Implement ModelDriver for Box<dyn ModelDriver> to allow dynamic dispatch
#[async_trait]
impl ModelDriver for Box<dyn ModelDriver> {
    async fn generate_stream(
        &self,
        messages: Vec<ModelMessage>,
        config: &ModelCallConfig,
    ) -> Result<ModelStream> {
        (**self).generate_stream(messages, config).await
    }

    async fn generate(
        &self,
        messages: Vec<ModelMessage>,
        config: &ModelCallConfig,
    ) -> Result<ModelResponse> {
        (**self).generate(messages, config).await
    }
}

// ============================================================================
// Message and Configuration Types
// ============================================================================

/// Message format for model calls (provider-agnostic)
#[derive(Debug, Clone)]
pub struct ModelMessage {
    pub role: ModelRole,
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub tool_call_id: Option<String>,
}

impl ModelMessage {
    /// Create a plain text message
    pub fn text(role: ModelRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Message role for model calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Configuration for one model call
#[derive(Debug, Clone)]
pub struct ModelCallConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Vec<ToolDefinition>,
}

impl ModelCallConfig {
    /// Build a call config from a task config plus the task's tool definitions
    pub fn from_task(config: &TaskConfig, tools: Vec<ToolDefinition>) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            tools,
        }
    }
}

/// Response from a model call (non-streaming)
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub text: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub metadata: CompletionMetadata,
}

impl ModelResponse {
    /// Check whether the response declares any tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|tc| !tc.is_empty())
    }
}

// ============================================================================
// Conversion helpers
// ============================================================================

impl From<&Message> for ModelMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            MessageRole::System => ModelRole::System,
            MessageRole::User => ModelRole::User,
            MessageRole::Assistant => ModelRole::Assistant,
            MessageRole::ToolResult => ModelRole::Tool,
        };

        ModelMessage {
            role,
            content: msg.content.to_llm_string(),
            tool_calls: msg.tool_calls.clone(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}
