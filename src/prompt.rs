//! Prompt assembly: the tool catalog and the system prompts of both phases.
//!
//! Everything here is a pure function of its inputs so the same registry
//! always yields byte-identical prompts.

use itertools::Itertools;
use serde::Serialize;
use serde_json::{json, Value};

use crate::intent::{render_directive, SENTINEL};
use crate::model::Message;
use crate::tools::{Arguments, ParameterSpec, Tool};

/// How the catalog is embedded in the system prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogFormat {
    /// Human-readable sections per tool.
    #[default]
    Text,
    /// Pretty-printed JSON with a JSON schema per tool.
    Json,
}

const TOOL_SEPARATOR: &str = "\n\n---\n\n";

/// Render the catalog in the requested format.
pub fn render_catalog<'a>(tools: impl IntoIterator<Item = &'a Tool>, format: CatalogFormat) -> String {
    match format {
        CatalogFormat::Text => build_catalog(tools),
        CatalogFormat::Json => serde_json::to_string_pretty(&build_catalog_json(tools))
            .unwrap_or_else(|_| "[]".to_string()),
    }
}

/// Text catalog of `tools`, in the order given.
pub fn build_catalog<'a>(tools: impl IntoIterator<Item = &'a Tool>) -> String {
    tools.into_iter().map(render_tool).join(TOOL_SEPARATOR)
}

/// Structured catalog: one object per tool with a JSON schema for its
/// arguments.
pub fn build_catalog_json<'a>(tools: impl IntoIterator<Item = &'a Tool>) -> Value {
    Value::Array(
        tools
            .into_iter()
            .map(|tool| {
                let mut entry = json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema(),
                    "returns": tool.return_description(),
                });
                if !tool.code_example().is_empty() {
                    entry["code_example"] = Value::String(tool.code_example().to_string());
                }
                entry
            })
            .collect(),
    )
}

/// Documentation block for a single tool.
pub fn render_tool(tool: &Tool) -> String {
    let args = if tool.parameters().is_empty() {
        "None".to_string()
    } else {
        tool.parameters().iter().map(render_parameter).join("\n")
    };

    let mut sections = vec![
        format!("Name:\n{}", tool.name()),
        format!("Description:\n{}", or_none(tool.description())),
        format!("Args:\n{}", args),
        format!("Returns:\n{}", or_none(tool.return_description())),
    ];
    if !tool.code_example().is_empty() {
        sections.push(format!("Code Example:\n{}", tool.code_example()));
    }
    sections.join("\n\n")
}

fn render_parameter(param: &ParameterSpec) -> String {
    match (param.type_hint.is_empty(), param.description.is_empty()) {
        (true, true) => param.name.clone(),
        (true, false) => format!("{}: {}", param.name, param.description),
        (false, true) => format!("{} ({})", param.name, param.type_hint),
        (false, false) => format!("{} ({}): {}", param.name, param.type_hint, param.description),
    }
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "None"
    } else {
        text
    }
}

/// First-phase system prompt: the catalog plus the invocation format.
pub fn build_system_prompt(catalog: &str) -> String {
    format!(
        "You are the first stage in a framework that helps users interact with generative AI.\n\
         Decide whether answering the user's request requires calling one of the tools documented below.\n\
         \n\
         If a tool is needed, reply with exactly one line and nothing else:\n\
         {sentinel} {{\"name\": \"<tool name>\", \"arguments\": {{\"<parameter>\": <value>}}}}\n\
         \n\
         The arguments must be a JSON object keyed by the parameter names listed under Args, \
         with values of the documented types. Call at most one tool.\n\
         If no tool is needed, answer the user directly and never write {sentinel}.\n\
         \n\
         Documentation for each tool is as follows:\n\
         \n\
         {catalog}",
        sentinel = SENTINEL,
        catalog = if catalog.is_empty() { "No tools are available." } else { catalog },
    )
}

/// Second-phase system prompt, sent together with the tool's outcome.
///
/// `tool` is `None` when the model's directive could not be read at all.
pub fn build_answer_prompt(tool: Option<&Tool>) -> String {
    let documentation = tool
        .map(render_tool)
        .unwrap_or_else(|| "No tool could be called.".to_string());

    format!(
        "You are the last step in a framework that helps users interact with generative AI.\n\
         Before you received this request, another assistant chose a tool to call. \
         The user request is listed below together with the result of that call.\n\
         \n\
         Your job is to:\n\
         1. Understand the user request\n\
         2. Understand the tool call that was made and why\n\
         3. Answer with the best response to the user request, using the tool result as though you are a research assistant\n\
         \n\
         If the call reported an error, say briefly that the information could not be retrieved \
         and answer as well as you can without it. Do not request any further tool calls.\n\
         \n\
         Documentation for the tool that was used:\n\
         \n\
         {documentation}"
    )
}

/// Few-shot messages teaching the model the directive format with each
/// tool's own examples.
pub fn build_few_shot<'a>(tools: impl IntoIterator<Item = &'a Tool>) -> Vec<Message> {
    tools
        .into_iter()
        .flat_map(|tool| {
            tool.examples().iter().flat_map(move |example| {
                [
                    Message::user(example.query.clone()),
                    Message::assistant(render_directive(tool.name(), &example.arguments)),
                ]
            })
        })
        .collect()
}

/// Few-shot messages showing how a tool result becomes an answer.
pub fn build_answer_few_shot(tool: &Tool) -> Vec<Message> {
    tool.examples()
        .iter()
        .flat_map(|example| {
            let report = ToolReport {
                user_request: &example.query,
                tool: tool.name(),
                arguments: &example.arguments,
                result: Some(Value::String(example.result.clone())),
                error: None,
            };
            [
                Message::user(report.to_prompt()),
                Message::assistant(example.response.clone()),
            ]
        })
        .collect()
}

/// The user-facing payload of the second phase.
#[derive(Debug, Serialize)]
pub struct ToolReport<'a> {
    pub user_request: &'a str,
    pub tool: &'a str,
    pub arguments: &'a Arguments,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolReport<'_> {
    pub fn to_prompt(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}
