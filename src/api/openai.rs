//! OpenAI-compatible Chat Completions client.
//!
//! Only plain text completions are used: tool catalogs travel inside the
//! system prompt, so the request never carries native `tools` definitions.
//! See: <https://platform.openai.com/docs/api-reference/chat>

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::client::{ChatCompletion, ClientError};
use crate::http::{add_extra_headers, build_http_client, RequestBuilderExt, ResponseExt};
use crate::model::Message;
use crate::options::{ModelOptions, TransportOptions};

/// Base URL of the public OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for any service speaking the OpenAI Chat Completions format.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model_options: ModelOptions,
    transport_options: TransportOptions,
    http: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client against the public OpenAI endpoint with default options.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL,
            ModelOptions::default(),
            TransportOptions::default(),
        )
    }

    /// Create a client with explicit endpoint and options.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model_options: ModelOptions,
        transport_options: TransportOptions,
    ) -> Result<Self, ClientError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClientError::Config("API key is required".to_string()));
        }

        let http = build_http_client(&transport_options)?;
        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_options,
            transport_options,
            http,
        })
    }

    pub fn model_options(&self) -> &ModelOptions {
        &self.model_options
    }

    pub fn transport_options(&self) -> &TransportOptions {
        &self.transport_options
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn handle_error_response(status: reqwest::StatusCode, body: &str) -> ClientError {
        if let Ok(error_resp) = serde_json::from_str::<ChatErrorResponse>(body) {
            ClientError::Provider(format!(
                "API error ({}): {}",
                error_resp.error.error_type.as_deref().unwrap_or("unknown"),
                error_resp.error.message
            ))
        } else {
            ClientError::Provider(format!("HTTP {}: {}", status, body))
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<String, ClientError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request_body = ChatRequest {
            model: &self.model_options.model,
            messages: &messages,
            temperature: temperature.or(self.model_options.temperature),
            top_p: self.model_options.top_p,
            max_tokens: self.model_options.max_tokens,
        };

        let mut req = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json");
        req = add_extra_headers(req, &self.transport_options);

        let response = req.json_logged(&request_body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text_logged().await.unwrap_or_default();
            return Err(Self::handle_error_response(status, &body));
        }

        let chat_response: ChatResponse = response.json_logged().await?;
        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ClientError::Provider("response contained no choices".to_string()))
    }
}

// --- Chat Completions API Types ---

#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorResponse {
    error: ChatError,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: String,
}
