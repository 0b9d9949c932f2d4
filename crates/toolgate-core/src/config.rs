// Task configuration for the orchestration loop
//
// TaskConfig is a transport-agnostic configuration struct that can be
// created directly or deserialized from a gateway request.

use serde::{Deserialize, Serialize};

/// Configuration for one task execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// System prompt that defines the agent's behavior
    pub system_prompt: String,

    /// Model identifier (e.g., "gpt-4o")
    pub model: String,

    /// Maximum number of generate-then-act rounds (prevents infinite loops)
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Maximum number of tool invocations across the whole task
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,

    /// Temperature for model sampling (0.0 - 2.0)
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate per response
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_max_rounds() -> usize {
    10
}

fn default_max_tool_calls() -> usize {
    10
}

impl TaskConfig {
    /// Create a new task configuration
    pub fn new(system_prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            model: model.into(),
            max_rounds: default_max_rounds(),
            max_tool_calls: default_max_tool_calls(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set maximum rounds
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set the total tool invocation budget
    pub fn with_max_tool_calls(mut self, max_tool_calls: usize) -> Self {
        self.max_tool_calls = max_tool_calls;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::new(
            "You are a helpful assistant that completes tasks using the available tools.",
            "gpt-4o",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TaskConfig::new("You are helpful.", "gpt-4o");
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.max_tool_calls, 10);
        assert!(config.temperature.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let config = TaskConfig::new("You are helpful.", "gpt-4o")
            .with_max_rounds(3)
            .with_max_tool_calls(5)
            .with_temperature(0.2)
            .with_max_tokens(1024);

        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.max_tool_calls, 5);
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(1024));
    }

    #[test]
    fn test_deserialize_applies_limit_defaults() {
        let config: TaskConfig =
            serde_json::from_str(r#"{"system_prompt": "sp", "model": "gpt-4o"}"#).unwrap();
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.max_tool_calls, 10);
    }
}
