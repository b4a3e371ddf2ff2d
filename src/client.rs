//! Chat completion trait and transport error types.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Message;

/// Errors that can occur while talking to the chat completion service.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A service that turns an ordered list of messages into the assistant's reply.
///
/// This is the only seam between the orchestrator and the model. The
/// orchestrator never sees provider wire formats, only message content.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send `messages` and return the assistant's text.
    ///
    /// `temperature` overrides the client's configured sampling temperature
    /// for this call only.
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<String, ClientError>;
}

#[async_trait]
impl<T: ChatCompletion + ?Sized> ChatCompletion for Box<T> {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<String, ClientError> {
        (**self).complete(messages, temperature).await
    }
}

#[async_trait]
impl<T: ChatCompletion + ?Sized> ChatCompletion for std::sync::Arc<T> {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<String, ClientError> {
        (**self).complete(messages, temperature).await
    }
}
