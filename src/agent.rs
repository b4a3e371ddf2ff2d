//! `AiApi`: registers tools and answers queries with at most one tool call.

use std::fmt::Display;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::OpenAiClient;
use crate::client::{ChatCompletion, ClientError};
use crate::config::AiApiConfig;
use crate::intent::{self, ToolCallIntent};
use crate::logging;
use crate::model::Message;
use crate::prompt::{self, ToolReport};
use crate::registry::{Registry, RegistryError};
use crate::spec::{ApiSpec, SpecError};
use crate::tools::{Arguments, Tool, ToolError};

#[derive(Debug, Error)]
pub enum AiApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("tool `{tool}` failed: {source}")]
    ToolInvocation {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("chat completion failed: {0}")]
    Transport(#[from] ClientError),
}

/// Phases of a single `execute_query` call. Every call starts and ends in
/// `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryState {
    Idle,
    AwaitingModelDecision,
    Answering,
    InvokingTool,
    AwaitingFinalAnswer,
}

impl QueryState {
    fn advance(&mut self, next: QueryState) {
        debug!(from = ?*self, to = ?next, "Query state");
        *self = next;
    }
}

/// Exposes registered functions to a chat model.
///
/// A query is answered in one of two ways:
/// 1. The model answers directly and its text is returned unchanged.
/// 2. The model asks for one tool; the tool runs and a second request lets
///    the model phrase the answer from the tool's result or error.
///
/// # Example
/// ```ignore
/// let mut app = AiApi::new(AiApiConfig::from_env())?;
/// app.register(get_random_number_api())?;
///
/// let answer = app.execute_query("Roll a die for me").await?;
/// ```
pub struct AiApi<C: ChatCompletion = OpenAiClient> {
    client: C,
    config: AiApiConfig,
    registry: Registry,
}

impl AiApi<OpenAiClient> {
    /// Create an instance talking to the OpenAI-compatible endpoint in
    /// `config`.
    pub fn new(config: AiApiConfig) -> Result<Self, AiApiError> {
        let client = OpenAiClient::with_options(
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
            config.transport.clone(),
        )?;
        Ok(Self::with_client(client, config))
    }
}

impl<C: ChatCompletion> AiApi<C> {
    /// Create an instance on top of any chat completion client.
    pub fn with_client(client: C, config: AiApiConfig) -> Self {
        if let Some(level) = config.log_level {
            logging::init(level);
        }
        Self {
            client,
            config,
            registry: Registry::new(),
        }
    }

    pub fn config(&self) -> &AiApiConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a tool under its own name.
    pub fn register(&mut self, tool: Tool) -> Result<&Tool, AiApiError> {
        Ok(self.registry.register(tool)?)
    }

    /// Register a tool under `name`.
    pub fn register_as(&mut self, tool: Tool, name: impl Into<String>) -> Result<&Tool, AiApiError> {
        Ok(self.registry.register_as(tool, name)?)
    }

    /// Register or overwrite a tool.
    pub fn replace(&mut self, tool: Tool) -> Option<Tool> {
        self.registry.replace(tool)
    }

    /// Register `handler` documented by an explicit spec. The spec must be
    /// valid and carry the same `name`.
    pub fn register_spec<F>(&mut self, name: &str, spec: ApiSpec, handler: F) -> Result<&Tool, AiApiError>
    where
        F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let tool = spec.into_tool_named(name, handler)?;
        self.register(tool)
    }

    pub fn lookup(&self, name: &str) -> Result<&Tool, AiApiError> {
        Ok(self.registry.lookup(name)?)
    }

    pub fn list_tools(&self) -> Vec<&Tool> {
        self.registry.list_tools()
    }

    /// The tool catalog in the configured format.
    pub fn catalog(&self) -> String {
        prompt::render_catalog(self.registry.list_tools(), self.config.catalog_format)
    }

    /// The first-phase system prompt for the current registry.
    pub fn system_prompt(&self) -> String {
        prompt::build_system_prompt(&self.catalog())
    }

    fn decision_messages(&self, user_text: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system_prompt())];
        messages.extend(prompt::build_few_shot(self.registry.list_tools()));
        messages.push(Message::user(user_text));
        messages
    }

    async fn decide(&self, user_text: &str) -> Result<String, AiApiError> {
        let messages = self.decision_messages(user_text);
        debug!(
            "Asking model to pick a tool with {} messages and {} tools",
            messages.len(),
            self.registry.len()
        );
        Ok(self
            .client
            .complete(messages, Some(self.config.decision_temperature))
            .await?)
    }

    /// Ask the model which tool, if any, answers `user_text`, without
    /// running it.
    ///
    /// An unreadable directive is reported as a direct answer carrying the
    /// raw reply.
    pub async fn identify_tool(&self, user_text: &str) -> Result<ToolCallIntent, AiApiError> {
        let reply = self.decide(user_text).await?;
        Ok(intent::parse_response(&reply).unwrap_or_else(|err| {
            warn!(error = %err, "Model returned an unreadable tool directive");
            ToolCallIntent::DirectAnswer { text: reply }
        }))
    }

    /// Invoke a registered tool directly.
    pub fn run_tool(&self, name: &str, arguments: Arguments) -> Result<Value, AiApiError> {
        let tool = self.registry.lookup(name)?;
        tool.invoke(arguments)
            .map_err(|source| AiApiError::ToolInvocation {
                tool: tool.name().to_string(),
                source,
            })
    }

    /// Answer `user_text`, calling at most one registered tool.
    ///
    /// Only transport failures are returned as errors. Unknown tools,
    /// unreadable directives and failing handlers all still yield text.
    pub async fn execute_query(&self, user_text: &str) -> Result<String, AiApiError> {
        let mut state = QueryState::Idle;
        state.advance(QueryState::AwaitingModelDecision);

        let reply = self.decide(user_text).await?;

        let (tool, arguments, outcome) = match intent::parse_response(&reply) {
            Ok(ToolCallIntent::DirectAnswer { text }) => {
                state.advance(QueryState::Answering);
                debug!("Model answered directly");
                state.advance(QueryState::Idle);
                return Ok(text);
            }
            Ok(ToolCallIntent::InvokeTool {
                tool_name,
                arguments,
            }) => {
                let tool = match self.registry.lookup(&tool_name) {
                    Ok(tool) => tool,
                    Err(err) => {
                        warn!(error = %err, "Model requested an unknown tool");
                        state.advance(QueryState::Idle);
                        return Ok(unknown_tool_reply(&tool_name));
                    }
                };

                state.advance(QueryState::InvokingTool);
                info!("Tool call requested: {}", tool.name());
                let outcome = tool.invoke(arguments.clone()).map_err(|source| {
                    AiApiError::ToolInvocation {
                        tool: tool.name().to_string(),
                        source,
                    }
                });
                match &outcome {
                    Ok(result) => {
                        info!("Tool {} executed successfully", tool.name());
                        debug!("Tool result: {}", result);
                    }
                    Err(e) => warn!("Tool {} execution failed: {}", tool.name(), e),
                }
                (Some(tool), arguments, outcome.map_err(|e| e.to_string()))
            }
            Err(err) => {
                warn!(error = %err, "Model returned an unreadable tool directive");
                (
                    None,
                    Arguments::new(),
                    Err(format!("the tool request could not be read: {}", err)),
                )
            }
        };

        state.advance(QueryState::AwaitingFinalAnswer);
        let answer = self.answer_query(user_text, tool, &arguments, outcome).await?;

        state.advance(QueryState::Idle);
        Ok(answer)
    }

    /// Ask the model for the final answer given a tool's outcome.
    ///
    /// This is the second phase of [`AiApi::execute_query`], usable on its own
    /// after [`AiApi::identify_tool`] and [`AiApi::run_tool`]. `tool` is `None`
    /// when no tool could be called; `outcome` carries the tool's result or
    /// a description of what went wrong.
    pub async fn answer_query<E: Display>(
        &self,
        user_text: &str,
        tool: Option<&Tool>,
        arguments: &Arguments,
        outcome: Result<Value, E>,
    ) -> Result<String, AiApiError> {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(description) => (None, Some(description.to_string())),
        };
        let report = ToolReport {
            user_request: user_text,
            tool: tool.map(Tool::name).unwrap_or_default(),
            arguments,
            result,
            error,
        };

        let mut messages = vec![Message::system(prompt::build_answer_prompt(tool))];
        if let Some(tool) = tool {
            messages.extend(prompt::build_answer_few_shot(tool));
        }
        messages.push(Message::user(report.to_prompt()));

        debug!("Asking model for the final answer with {} messages", messages.len());
        Ok(self
            .client
            .complete(messages, Some(self.config.answer_temperature))
            .await?)
    }
}

fn unknown_tool_reply(tool_name: &str) -> String {
    format!(
        "Sorry, I couldn't complete that request: the assistant tried to use a tool named \"{}\", which isn't available.",
        tool_name
    )
}
