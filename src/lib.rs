//! # ai_api - documented functions as chat model tools
//!
//! Register ordinary Rust functions as tools a chat model can call. The
//! function's doc comment is the source of truth for how the model should
//! call it: its description, `Args` and `Returns` sections are turned into a
//! tool catalog that travels in the system prompt.
//!
//! ## Architecture
//!
//! 1. **Registration**: `#[register_api]` captures a function's doc comment
//!    and signature; [`AiApi::register`] adds the resulting [`Tool`] to the
//!    instance's [`Registry`].
//! 2. **Docstring parsing**: [`docstring::parse`] extracts description,
//!    parameters, return description and code example.
//! 3. **Prompt assembly**: [`prompt`] renders the catalog and the system
//!    prompts of both phases.
//! 4. **Orchestration**: [`AiApi::execute_query`] asks the model, runs at
//!    most one tool, and asks again for the final answer.
//!
//! The model is reached through the [`ChatCompletion`] trait;
//! [`OpenAiClient`] implements it for OpenAI-compatible endpoints.
//!
//! ## Example
//! ```no_run
//! use ai_api::{register_api, AiApi, AiApiConfig, LogLevel};
//!
//! /// Returns a random number between low and high
//! ///
//! /// Args:
//! ///     low (int): The lowest possible number
//! ///     high (int): The highest possible number
//! ///
//! /// Returns:
//! ///     int: A random number between low and high
//! #[register_api]
//! fn get_random_number(low: i64, high: i64) -> i64 {
//!     (low + high) / 2
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AiApiConfig::new("your-api-key").with_log_level(LogLevel::Debug);
//!     let mut app = AiApi::new(config)?;
//!     app.register(get_random_number_api())?;
//!
//!     let answer = app.execute_query("Pick a number between 1 and 10").await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

// Lets `#[register_api]` expansions name `::ai_api` inside this crate too.
extern crate self as ai_api;

pub mod agent;
pub mod api;
pub mod client;
pub mod config;
pub mod docstring;
pub mod http;
pub mod intent;
pub mod logging;
pub mod model;
pub mod options;
pub mod prompt;
pub mod registry;
pub mod spec;
pub mod tools;

pub use agent::{AiApi, AiApiError};
pub use api::OpenAiClient;
pub use client::{ChatCompletion, ClientError};
pub use config::AiApiConfig;
pub use intent::ToolCallIntent;
pub use logging::LogLevel;
pub use model::{Message, Role};
pub use options::{ModelOptions, TransportOptions};
pub use prompt::CatalogFormat;
pub use registry::{Registry, RegistryError};
pub use spec::{ApiSpec, ArgSpec, SpecError};
pub use tools::{Arguments, ParameterSpec, SignatureParam, Tool, ToolError, ToolExample};

// Used by `#[register_api]` expansions.
pub use serde_json;

pub use ai_api_macros::register_api;
