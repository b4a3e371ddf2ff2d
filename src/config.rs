//! Construction-time configuration for [`AiApi`](crate::AiApi).

use std::env;

use crate::api::openai::DEFAULT_BASE_URL;
use crate::logging::LogLevel;
use crate::options::{ModelOptions, TransportOptions};
use crate::prompt::CatalogFormat;

/// Temperature used when the model picks a tool.
pub const DEFAULT_DECISION_TEMPERATURE: f32 = 0.0;
/// Temperature used when the model writes the final answer.
pub const DEFAULT_ANSWER_TEMPERATURE: f32 = 0.3;

/// Everything an [`AiApi`](crate::AiApi) instance needs. There is no
/// global state: two instances with different configs do not interact.
#[derive(Debug, Clone)]
pub struct AiApiConfig {
    pub api_key: String,
    /// When set, a `tracing` subscriber is installed at this level on
    /// construction unless one already exists.
    pub log_level: Option<LogLevel>,
    pub base_url: String,
    pub model: ModelOptions,
    pub transport: TransportOptions,
    pub decision_temperature: f32,
    pub answer_temperature: f32,
    pub catalog_format: CatalogFormat,
}

impl AiApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            log_level: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: ModelOptions::default(),
            transport: TransportOptions::default(),
            decision_temperature: DEFAULT_DECISION_TEMPERATURE,
            answer_temperature: DEFAULT_ANSWER_TEMPERATURE,
            catalog_format: CatalogFormat::default(),
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `AI_API_MODEL` and
    /// `AI_API_LOG_LEVEL`. Unset or unparsable variables keep defaults.
    pub fn from_env() -> Self {
        let mut config = Self::new(env::var("OPENAI_API_KEY").unwrap_or_default());
        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = env::var("AI_API_MODEL") {
            config.model.model = model;
        }
        config.log_level = env::var("AI_API_LOG_LEVEL")
            .ok()
            .and_then(|level| level.parse().ok());
        config
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: ModelOptions) -> Self {
        self.model = model;
        self
    }

    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_temperatures(mut self, decision: f32, answer: f32) -> Self {
        self.decision_temperature = decision;
        self.answer_temperature = answer;
        self
    }

    pub fn with_catalog_format(mut self, format: CatalogFormat) -> Self {
        self.catalog_format = format;
        self
    }
}
