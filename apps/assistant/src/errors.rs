use serde_json::{json, Value};
use thiserror::Error;

use crate::extractor::ExtractionError;
use crate::llm_client::LlmError;

/// Guidance returned instead of calling the model when an input is missing.
pub const MISSING_INPUT_MESSAGE: &str = "Please provide both a job description and a PDF CV.";

/// Every way an analysis request can end without a full answer.
/// Each variant is recovered locally and shown to the user as one final string.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing job description or CV")]
    MissingInput,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    RemoteApi(#[from] LlmError),

    #[error("{0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::MissingInput => "MISSING_INPUT",
            PipelineError::Extraction(_) => "EXTRACTION_ERROR",
            PipelineError::RemoteApi(_) => "API_ERROR",
            PipelineError::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    /// The single terminal string the user sees for this failure.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::MissingInput => MISSING_INPUT_MESSAGE.to_string(),
            PipelineError::RemoteApi(e) => format!("OpenAI API Error: {e}"),
            PipelineError::Extraction(_) | PipelineError::Unexpected(_) => {
                format!("Unexpected error: {self}")
            }
        }
    }

    /// JSON body for the terminal error event, same shape as the API's error bodies.
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.user_message()
            }
        })
    }
}
