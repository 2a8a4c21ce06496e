//! Chat-completion LLM access for ranking and summarizing.
//!
//! The pipeline only sees the `LlmClient` trait; `ChatCompletionClient` talks to
//! an OpenAI-compatible endpoint and `MockLlmClient` serves canned replies.

pub mod client;
pub mod json;

pub use client::*;
pub use json::extract_json;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM client disabled: no API key configured")]
    Disabled,

    #[error("Cannot reach LLM endpoint at {0}")]
    Connection(String),

    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),
}

/// Chat-style language model.
pub trait LlmClient: Send + Sync {
    /// Whether calls can be made at all (credentials present).
    fn enabled(&self) -> bool;

    /// Send one system + user exchange and return the assistant content.
    fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, LlmError>;

    /// Same as `chat`, with the reply parsed as a JSON object.
    fn chat_json(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<serde_json::Value, LlmError> {
        let content = self.chat(model, system, user, temperature)?;
        extract_json(&content)
    }
}
