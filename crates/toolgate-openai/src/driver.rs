// OpenAI-protocol driver
//
// Streams chat completions over SSE from any OpenAI-compatible endpoint.
// Tool-call arguments arrive fragmented across chunks and are accumulated
// by index; the accumulated argument string is parsed as JSON at the end of
// the call, falling back to the raw string when it does not parse.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use toolgate_core::error::{Result, TaskError};
use toolgate_core::{
    CompletionMetadata, ModelCallConfig, ModelDriver, ModelEvent, ModelMessage, ModelRole,
    ModelStream, ToolCall, ToolDefinition,
};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Model driver for OpenAI-compatible chat completion APIs.
///
/// # Example
///
/// ```ignore
/// use toolgate_openai::OpenAiDriver;
///
/// let driver = OpenAiDriver::from_env()?;
/// // or
/// let driver = OpenAiDriver::new("your-api-key");
/// // or with a custom endpoint
/// let driver = OpenAiDriver::with_base_url("your-api-key", "https://api.example.com/v1/chat/completions");
/// ```
#[derive(Clone)]
pub struct OpenAiDriver {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenAiDriver {
    /// Create a new driver with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Create a new driver from the OPENAI_API_KEY environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| TaskError::model("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    /// Create a new driver with a custom API URL
    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }

    /// Get the API URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn convert_role(role: ModelRole) -> &'static str {
        match role {
            ModelRole::System => "system",
            ModelRole::User => "user",
            ModelRole::Assistant => "assistant",
            ModelRole::Tool => "tool",
        }
    }

    fn convert_message(msg: &ModelMessage) -> WireMessage {
        WireMessage {
            role: Self::convert_role(msg.role).to_string(),
            content: Some(msg.content.clone()),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| WireToolCall {
                        id: tc.id.clone(),
                        r#type: "function".to_string(),
                        function: WireFunctionCall {
                            name: tc.name.clone(),
                            arguments: serde_json::to_string(&tc.arguments)
                                .unwrap_or_default(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|tool| WireTool {
                r#type: "function".to_string(),
                function: WireFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect()
    }

    /// Parse an accumulated argument string, falling back to the raw string
    /// when the model emitted something that is not valid JSON.
    fn parse_arguments(raw: &str) -> Value {
        if raw.is_empty() {
            return json!({});
        }
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}

#[async_trait]
impl ModelDriver for OpenAiDriver {
    async fn generate_stream(
        &self,
        messages: Vec<ModelMessage>,
        config: &ModelCallConfig,
    ) -> Result<ModelStream> {
        let wire_messages: Vec<WireMessage> =
            messages.iter().map(Self::convert_message).collect();

        let tools = if config.tools.is_empty() {
            None
        } else {
            Some(Self::convert_tools(&config.tools))
        };

        let request = WireRequest {
            model: config.model.clone(),
            messages: wire_messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: true,
            stream_options: Some(WireStreamOptions {
                include_usage: true,
            }),
            tools,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| TaskError::model(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TaskError::model(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let event_stream = response.bytes_stream().eventsource();

        let model = config.model.clone();
        let usage = Arc::new(Mutex::new(None::<WireUsage>));
        let delta_count = Arc::new(Mutex::new(0u32));
        let accumulated_tool_calls = Arc::new(Mutex::new(Vec::<PartialToolCall>::new()));

        let converted: ModelStream = Box::pin(event_stream.then(move |result| {
            let model = model.clone();
            let usage = Arc::clone(&usage);
            let delta_count = Arc::clone(&delta_count);
            let accumulated_tool_calls = Arc::clone(&accumulated_tool_calls);

            async move {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => return Ok(ModelEvent::Error(format!("Stream error: {}", e))),
                };

                if event.data == "[DONE]" {
                    return Ok(ModelEvent::Done(build_metadata(
                        &model,
                        &usage,
                        &delta_count,
                        None,
                    )));
                }

                let chunk = match serde_json::from_str::<WireStreamChunk>(&event.data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        return Ok(ModelEvent::Error(format!("Failed to parse chunk: {}", e)))
                    }
                };

                // The usage chunk may arrive with an empty choices array
                if let Some(chunk_usage) = chunk.usage {
                    *usage.lock().unwrap() = Some(chunk_usage);
                }

                let Some(choice) = chunk.choices.first() else {
                    return Ok(ModelEvent::TextDelta(String::new()));
                };

                // Tool call fragments: accumulate by index
                if let Some(tool_calls) = &choice.delta.tool_calls {
                    let mut acc = accumulated_tool_calls.lock().unwrap();

                    for tc in tool_calls {
                        let idx = tc.index as usize;
                        while acc.len() <= idx {
                            acc.push(PartialToolCall::default());
                        }

                        if let Some(id) = &tc.id {
                            acc[idx].id = id.clone();
                        }
                        if let Some(function) = &tc.function {
                            if let Some(name) = &function.name {
                                acc[idx].name = name.clone();
                            }
                            if let Some(args) = &function.arguments {
                                acc[idx].arguments.push_str(args);
                            }
                        }
                    }
                    return Ok(ModelEvent::TextDelta(String::new()));
                }

                // Content delta
                if let Some(content) = &choice.delta.content {
                    *delta_count.lock().unwrap() += 1;
                    return Ok(ModelEvent::TextDelta(content.clone()));
                }

                // Finish reason terminates the choice
                if let Some(finish_reason) = &choice.finish_reason {
                    if finish_reason == "tool_calls" {
                        let acc = accumulated_tool_calls.lock().unwrap().clone();
                        if !acc.is_empty() {
                            let calls: Vec<ToolCall> = acc
                                .into_iter()
                                .map(|partial| ToolCall {
                                    id: partial.id,
                                    name: partial.name,
                                    arguments: Self::parse_arguments(&partial.arguments),
                                })
                                .collect();
                            return Ok(ModelEvent::ToolCalls(calls));
                        }
                    }

                    return Ok(ModelEvent::Done(build_metadata(
                        &model,
                        &usage,
                        &delta_count,
                        Some(finish_reason.clone()),
                    )));
                }

                Ok(ModelEvent::TextDelta(String::new()))
            }
        }));

        Ok(converted)
    }
}

impl std::fmt::Debug for OpenAiDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiDriver")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Usage from the terminal usage chunk when the endpoint provides one;
/// the content-delta count is a coarse fallback for completion tokens.
fn build_metadata(
    model: &str,
    usage: &Mutex<Option<WireUsage>>,
    delta_count: &Mutex<u32>,
    finish_reason: Option<String>,
) -> CompletionMetadata {
    let usage = usage.lock().unwrap().clone();
    match usage {
        Some(u) => CompletionMetadata {
            prompt_tokens: Some(u.prompt_tokens),
            completion_tokens: Some(u.completion_tokens),
            total_tokens: Some(u.total_tokens),
            model: Some(model.to_string()),
            finish_reason,
        },
        None => {
            let count = *delta_count.lock().unwrap();
            CompletionMetadata {
                prompt_tokens: None,
                completion_tokens: Some(count),
                total_tokens: Some(count),
                model: Some(model.to_string()),
                finish_reason,
            }
        }
    }
}

/// Tool call being accumulated from stream fragments
#[derive(Debug, Clone, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<WireStreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize)]
struct WireStreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireTool {
    r#type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    r#type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireStreamChunk {
    #[serde(default)]
    choices: Vec<WireStreamChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireStreamChoice {
    delta: WireDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireStreamToolCall {
    index: u32,
    id: Option<String>,
    function: Option<WireStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct WireStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}
