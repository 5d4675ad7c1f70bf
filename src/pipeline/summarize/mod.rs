pub mod ollama;
pub mod summarizer;

pub use ollama::*;
pub use summarizer::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("Model {0} is not available")]
    ModelNotAvailable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// Abstraction over the language model service (allows mocking).
pub trait LlmClient {
    /// Generate a completion for `prompt` under an optional `system` prompt.
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError>;

    /// Whether a model whose name starts with `model` is installed.
    fn is_model_available(&self, model: &str) -> Result<bool, LlmError>;

    fn list_models(&self) -> Result<Vec<String>, LlmError>;
}
