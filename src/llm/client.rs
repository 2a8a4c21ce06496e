use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{LlmClient, LlmError};

pub const DEFAULT_ENDPOINT: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// Blocking client for an OpenAI-compatible chat-completion endpoint.
pub struct ChatCompletionClient {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl ChatCompletionClient {
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            client,
            timeout_secs,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient for ChatCompletionClient {
    fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        if !self.enabled() {
            return Err(LlmError::Disabled);
        }

        let body = ChatRequest {
            model,
            temperature,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection(self.endpoint.clone())
                } else if e.is_timeout() {
                    LlmError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    LlmError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("No choices[0].message.content".into()))
    }
}

/// Canned-reply client for tests and offline runs.
///
/// Replies are served in order; the last one repeats once the queue drains.
/// An empty queue fails every call.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    prompts: Mutex<Vec<String>>,
    enabled: bool,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::with_replies(vec![response.to_string()])
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            enabled: true,
        }
    }

    /// Enabled client whose every call fails.
    pub fn failing() -> Self {
        Self::with_replies(Vec::new())
    }

    /// Client reporting no credentials.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::failing()
        }
    }

    /// User prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn chat(
        &self,
        _model: &str,
        _system: &str,
        user: &str,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        if !self.enabled {
            return Err(LlmError::Disabled);
        }
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(user.to_string());
        }

        let mut replies = self
            .replies
            .lock()
            .map_err(|_| LlmError::HttpClient("mock poisoned".into()))?;
        let mut last = self
            .last
            .lock()
            .map_err(|_| LlmError::HttpClient("mock poisoned".into()))?;

        if let Some(next) = replies.pop_front() {
            *last = Some(next.clone());
            return Ok(next);
        }
        last.clone()
            .ok_or_else(|| LlmError::Connection("mock endpoint".into()))
    }
}
