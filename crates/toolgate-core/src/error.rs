// Error types for task execution

use thiserror::Error;

/// Result type alias for task execution operations
pub type Result<T> = std::result::Result<T, TaskError>;

/// Errors that can occur while executing a task
#[derive(Debug, Error)]
pub enum TaskError {
    /// Model driver error (network, API, stream parse)
    #[error("model error: {0}")]
    Model(String),

    /// Tool dispatch error
    #[error("tool dispatch error: {0}")]
    Tool(String),

    /// Event channel error (consumer dropped, queue closed)
    #[error("event channel error: {0}")]
    Channel(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Task was cancelled
    #[error("task cancelled")]
    Cancelled,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl TaskError {
    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        TaskError::Model(msg.into())
    }

    /// Create a tool dispatch error
    pub fn tool(msg: impl Into<String>) -> Self {
        TaskError::Tool(msg.into())
    }

    /// Create an event channel error
    pub fn channel(msg: impl Into<String>) -> Self {
        TaskError::Channel(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        TaskError::Config(msg.into())
    }
}
