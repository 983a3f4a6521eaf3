//! OpenAI-compatible chat-completions client

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{BackendError, ChatMessage, GenerationRequest};
use crate::infrastructure::traits::GenerationBackend;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking HTTP backend for a locally hosted model server.
#[derive(Debug, Clone)]
pub struct HttpGenerationBackend {
    base_url: Option<String>,
    timeout: Duration,
}

impl HttpGenerationBackend {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self { base_url, timeout }
    }

    /// Completions endpoint on the host of `base_url`.
    ///
    /// The first `localhost` is rewritten to `127.0.0.1` and any path on the
    /// base URL is replaced by `/v1/chat/completions`.
    pub fn endpoint(base_url: &str) -> Result<Url, BackendError> {
        let rewritten = base_url.trim().replacen("localhost", "127.0.0.1", 1);
        let mut url = Url::parse(&rewritten).map_err(|e| BackendError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl {
                url: base_url.to_string(),
                message: "not a hierarchical URL".to_string(),
            });
        }
        url.set_path(COMPLETIONS_PATH);
        Ok(url)
    }
}

impl GenerationBackend for HttpGenerationBackend {
    #[instrument(level = "debug", skip(self, request), fields(model = %request.model))]
    fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let base = self
            .base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(BackendError::NotConfigured)?;
        let url = Self::endpoint(base)?;

        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            response_format: request.json_response.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let connect_err = |e: reqwest::Error| BackendError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(connect_err)?;

        debug!("POST {}", url);
        let response = client.post(url.clone()).json(&body).send().map_err(connect_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::InvalidResponse("no message in reply".to_string()))
    }
}
