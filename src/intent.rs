//! Reading the model's decision: answer directly, or invoke a tool.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::tools::Arguments;

/// Marker that opens a tool invocation directive in a model reply.
pub const SENTINEL: &str = "CALL_TOOL:";

/// What the model asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallIntent {
    DirectAnswer { text: String },
    InvokeTool { tool_name: String, arguments: Arguments },
}

/// The model used the sentinel but the directive after it is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("tool directive is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("tool directive does not name a tool")]
    MissingName,

    #[error("tool arguments must be a JSON object, got {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Deserialize)]
struct Directive {
    name: String,
    #[serde(default, alias = "kwargs", alias = "args", alias = "parameters")]
    arguments: Value,
}

/// Format a directive exactly as the model is instructed to write it.
pub fn render_directive(tool_name: &str, arguments: &Arguments) -> String {
    format!(
        "{} {}",
        SENTINEL,
        json!({ "name": tool_name, "arguments": arguments })
    )
}

/// Interpret a model reply.
///
/// A reply without the sentinel is a direct answer and is returned
/// verbatim. Text after the sentinel must start with a JSON object,
/// optionally wrapped in a fenced code block; anything following the object
/// is ignored.
pub fn parse_response(reply: &str) -> Result<ToolCallIntent, IntentError> {
    let Some(start) = reply.find(SENTINEL) else {
        return Ok(ToolCallIntent::DirectAnswer {
            text: reply.to_string(),
        });
    };

    let rest = strip_fence(&reply[start + SENTINEL.len()..]);
    let value = serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| IntentError::InvalidJson("empty directive".to_string()))?
        .map_err(|e| IntentError::InvalidJson(e.to_string()))?;

    let directive: Directive = serde_json::from_value(value).map_err(|_| IntentError::MissingName)?;
    let tool_name = directive.name.trim().to_string();
    if tool_name.is_empty() {
        return Err(IntentError::MissingName);
    }

    let arguments = match directive.arguments {
        Value::Object(map) => map,
        Value::Null => Arguments::new(),
        // OpenAI function calls carry arguments as a JSON-encoded string.
        Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Object(map)) => map,
            _ => return Err(IntentError::InvalidArguments(Value::String(encoded).to_string())),
        },
        other => return Err(IntentError::InvalidArguments(other.to_string())),
    };

    Ok(ToolCallIntent::InvokeTool {
        tool_name,
        arguments,
    })
}

fn strip_fence(text: &str) -> &str {
    let text = text.trim_start();
    match text.strip_prefix("```") {
        Some(fenced) => {
            let body = fenced.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
            body.split("```").next().unwrap_or(body).trim()
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoke(tool_name: &str, arguments: Value) -> ToolCallIntent {
        ToolCallIntent::InvokeTool {
            tool_name: tool_name.to_string(),
            arguments: arguments.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn plain_text_is_a_direct_answer() {
        let intent = parse_response("Paris is the capital of France.").unwrap();
        assert_eq!(
            intent,
            ToolCallIntent::DirectAnswer {
                text: "Paris is the capital of France.".to_string()
            }
        );
    }

    #[test]
    fn directive_is_parsed() {
        let reply = r#"CALL_TOOL: {"name": "get_random_number", "arguments": {"low": 1, "high": 6}}"#;
        assert_eq!(
            parse_response(reply).unwrap(),
            invoke("get_random_number", json!({"low": 1, "high": 6}))
        );
    }

    #[test]
    fn directive_may_follow_preamble_and_fence() {
        let reply = "Let me check.\nCALL_TOOL: ```json\n{\"name\": \"lookup\", \"kwargs\": {\"ticker\": \"GM\"}}\n```\nthanks";
        assert_eq!(parse_response(reply).unwrap(), invoke("lookup", json!({"ticker": "GM"})));
    }

    #[test]
    fn string_encoded_arguments_are_decoded() {
        let reply = r#"CALL_TOOL: {"name": "add", "arguments": "{\"a\": 1, \"b\": 2}"}"#;
        assert_eq!(parse_response(reply).unwrap(), invoke("add", json!({"a": 1, "b": 2})));

        let reply = r#"CALL_TOOL: {"name": "add", "arguments": "a=1"}"#;
        assert!(matches!(
            parse_response(reply),
            Err(IntentError::InvalidArguments(_))
        ));
    }

    #[test]
    fn missing_arguments_mean_none() {
        let reply = r#"CALL_TOOL: {"name": "now"}"#;
        assert_eq!(parse_response(reply).unwrap(), invoke("now", json!({})));
    }

    #[test]
    fn malformed_directives_are_errors() {
        assert!(matches!(
            parse_response("CALL_TOOL: not json"),
            Err(IntentError::InvalidJson(_))
        ));
        assert!(matches!(parse_response("CALL_TOOL:"), Err(IntentError::InvalidJson(_))));
        assert_eq!(
            parse_response(r#"CALL_TOOL: {"arguments": {}}"#),
            Err(IntentError::MissingName)
        );
        assert!(matches!(
            parse_response(r#"CALL_TOOL: {"name": "x", "arguments": [1]}"#),
            Err(IntentError::InvalidArguments(_))
        ));
    }

    #[test]
    fn rendered_directive_parses_back() {
        let arguments = json!({"a": 1}).as_object().cloned().unwrap();
        let rendered = render_directive("add", &arguments);
        assert_eq!(rendered, r#"CALL_TOOL: {"name":"add","arguments":{"a":1}}"#);
        assert_eq!(parse_response(&rendered).unwrap(), invoke("add", json!({"a": 1})));
    }
}
