use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;

/// Body of an OpenAI-compatible `/completions` call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    #[serde(skip)]
    pub endpoint: String,
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Choice {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub usage: Option<Usage>,
    pub choices: Vec<Choice>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn completion_tokens(&self) -> u64 {
        self.usage.as_ref().map_or(0, |u| u.completion_tokens)
    }

    pub fn total_tokens(&self) -> u64 {
        self.usage.as_ref().map_or(0, |u| u.total_tokens)
    }

    pub fn first_text(&self) -> &str {
        self.choices.first().map_or("", |c| c.text.as_str())
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Non-success status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Response decode error: {0}")]
    Decode(String),
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),
    #[error("Request cancelled")]
    Cancelled,
}

/// The only capability the engine needs from the network.
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    async fn send(
        &self,
        request: &CompletionRequest,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError>;
}

pub fn build_client(max_connections: usize) -> Result<Client> {
    Ok(Client::builder()
        .pool_max_idle_per_host(max_connections)
        .tcp_nodelay(true)
        .no_proxy()
        .build()?)
}

/// reqwest-backed client shared by every request of a sweep.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(max_connections: usize) -> Result<Self> {
        Ok(Self {
            client: build_client(max_connections)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextGenerationClient for HttpClient {
    async fn send(
        &self,
        request: &CompletionRequest,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = format!("{}/completions", request.endpoint.trim_end_matches('/'));
        let transport_error = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else {
                TransportError::Http(e)
            }
        };
        let res = self
            .client
            .post(url)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status().as_u16();
        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let bytes = res.bytes().await.map_err(transport_error)?;
        let body: CompletionBody =
            serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(RawResponse {
            status,
            usage: body.usage,
            choices: body.choices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_omits_endpoint() {
        let request = CompletionRequest {
            endpoint: "http://localhost:8000/v1".into(),
            model: "m".into(),
            prompt: "p".into(),
            max_tokens: 100,
            temperature: 0.5,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"model": "m", "prompt": "p", "max_tokens": 100, "temperature": 0.5})
        );
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let body: CompletionBody = serde_json::from_str(r#"{"choices": [{"text": "hi"}]}"#).unwrap();
        let raw = RawResponse {
            status: 200,
            usage: body.usage,
            choices: body.choices,
        };
        assert_eq!(raw.completion_tokens(), 0);
        assert_eq!(raw.total_tokens(), 0);
        assert_eq!(raw.first_text(), "hi");
    }

    #[test]
    fn partial_usage_and_empty_choices() {
        let body: CompletionBody =
            serde_json::from_str(r#"{"usage": {"completion_tokens": 7}, "choices": []}"#).unwrap();
        let raw = RawResponse {
            status: 201,
            usage: body.usage,
            choices: body.choices,
        };
        assert!(raw.is_success());
        assert_eq!(raw.completion_tokens(), 7);
        assert_eq!(raw.total_tokens(), 0);
        assert_eq!(raw.first_text(), "");
    }
}
