//! Errors raised by the text-generation adapter.

use pipeline::PipelineError;
use thiserror::Error;

/// Service name reported in [`PipelineError::ExternalServiceUnavailable`].
pub const SERVICE: &str = "huggingface";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API token not set ({0})")]
    MissingToken(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Unexpected response format: {0}")]
    UnexpectedPayload(String),

    #[error("Model returned no usable text")]
    EmptyOutput,
}

impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        PipelineError::unavailable(SERVICE, err.to_string())
    }
}
