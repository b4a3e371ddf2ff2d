//! Tool descriptors: documented functions the model may ask to invoke.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use schemars::schema::{InstanceType, Metadata, ObjectValidation, Schema, SchemaObject};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::docstring;

/// Named arguments passed to a tool, keyed by parameter name.
pub type Arguments = Map<String, Value>;

/// Type-erased tool body.
pub type Handler = Arc<dyn Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync>;

/// Errors raised while invoking a tool.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("missing argument `{0}`")]
    MissingArgument(String),

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{0}")]
    Failed(String),

    #[error("tool panicked: {0}")]
    Panicked(String),
}

impl ToolError {
    pub fn failed(message: impl fmt::Display) -> Self {
        ToolError::Failed(message.to_string())
    }
}

/// A parameter as declared by the function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParam {
    pub name: String,
    pub type_hint: Option<String>,
}

impl SignatureParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
        }
    }

    pub fn typed(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: Some(type_hint.into()),
        }
    }
}

/// One documented tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    /// Free-form type name such as `str`, `int` or `Vec<String>`.
    pub type_hint: String,
    pub description: String,
}

impl ParameterSpec {
    pub fn new(
        name: impl Into<String>,
        type_hint: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_hint: type_hint.into(),
            description: description.into(),
        }
    }

    /// Kind of JSON value this parameter expects.
    pub fn kind(&self) -> ValueKind {
        ValueKind::from_type_hint(&self.type_hint)
    }

    /// Whether the model may leave this parameter out.
    pub fn is_optional(&self) -> bool {
        let hint = self.type_hint.trim();
        hint.starts_with("Option<") || hint.to_ascii_lowercase().contains("optional")
    }
}

/// A worked example shown to the model in few-shot prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExample {
    /// What the user asked.
    pub query: String,
    /// Arguments the tool should be called with.
    pub arguments: Arguments,
    /// What the tool returned.
    pub result: String,
    /// The final answer written from that result.
    pub response: String,
}

/// Coarse classification of a type hint, used for argument coercion and
/// the JSON schema of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    Text,
    List,
    Object,
    Any,
}

impl ValueKind {
    /// Classify a Python-ish or Rust type name. Unknown names map to `Any`.
    pub fn from_type_hint(hint: &str) -> Self {
        let mut hint = hint.trim();
        if let Some(inner) = hint.strip_prefix("Option<").and_then(|s| s.strip_suffix('>')) {
            hint = inner.trim();
        }
        let hint = leading_type(hint);
        let hint = hint.trim_start_matches('&').trim_start_matches("mut ");
        let lower = hint.to_ascii_lowercase();

        match lower.as_str() {
            "int" | "integer" | "long" | "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8"
            | "u16" | "u32" | "u64" | "u128" | "usize" => ValueKind::Integer,
            "float" | "double" | "number" | "decimal" | "f32" | "f64" => ValueKind::Float,
            "bool" | "boolean" => ValueKind::Boolean,
            "str" | "string" | "text" | "char" => ValueKind::Text,
            _ if lower.starts_with("list")
                || lower.starts_with("vec<")
                || lower.starts_with("tuple")
                || lower.starts_with("array")
                || lower.starts_with("set")
                || lower.starts_with("hashset<")
                || lower.starts_with('[')
                || lower.starts_with('(') =>
            {
                ValueKind::List
            }
            _ if lower.starts_with("dict")
                || lower.starts_with("map")
                || lower.starts_with("object")
                || lower.starts_with("hashmap<")
                || lower.starts_with("btreemap<") =>
            {
                ValueKind::Object
            }
            _ => ValueKind::Any,
        }
    }

    fn instance_type(self) -> Option<InstanceType> {
        match self {
            ValueKind::Integer => Some(InstanceType::Integer),
            ValueKind::Float => Some(InstanceType::Number),
            ValueKind::Boolean => Some(InstanceType::Boolean),
            ValueKind::Text => Some(InstanceType::String),
            ValueKind::List => Some(InstanceType::Array),
            ValueKind::Object => Some(InstanceType::Object),
            ValueKind::Any => None,
        }
    }

    /// Best-effort conversion of a model-supplied value. Values that cannot
    /// be converted are returned unchanged.
    pub fn coerce(self, value: Value) -> Value {
        match (self, value) {
            (ValueKind::Integer, Value::String(s)) => {
                let t = s.trim();
                if let Ok(n) = t.parse::<i64>() {
                    Value::from(n)
                } else if let Ok(n) = t.parse::<u64>() {
                    Value::from(n)
                } else {
                    Value::String(s)
                }
            }
            (ValueKind::Float, Value::String(s)) => match s.trim().parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(s),
            },
            (ValueKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Value::Bool(true),
                "false" | "no" | "0" => Value::Bool(false),
                _ => Value::String(s),
            },
            (ValueKind::List, Value::String(s)) => match serde_json::from_str::<Value>(&s) {
                Ok(parsed @ Value::Array(_)) => parsed,
                _ => Value::String(s),
            },
            (ValueKind::Object, Value::String(s)) => match serde_json::from_str::<Value>(&s) {
                Ok(parsed @ Value::Object(_)) => parsed,
                _ => Value::String(s),
            },
            (ValueKind::Text, Value::Number(n)) => Value::String(n.to_string()),
            (ValueKind::Text, Value::Bool(b)) => Value::String(b.to_string()),
            (_, value) => value,
        }
    }
}

/// The type before the first top-level comma, so `float, optional` reads as
/// `float` while `HashMap<String, i64>` stays whole.
fn leading_type(hint: &str) -> &str {
    let mut depth = 0usize;
    for (idx, c) in hint.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return hint[..idx].trim(),
            _ => {}
        }
    }
    hint.trim()
}

/// A registered tool: metadata for the prompt plus the callable behind it.
#[derive(Clone)]
pub struct Tool {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) parameters: Vec<ParameterSpec>,
    pub(crate) return_description: String,
    pub(crate) code_example: String,
    pub(crate) examples: Vec<ToolExample>,
    pub(crate) handler: Handler,
}

impl Tool {
    /// Build a tool from a documentation string and the function signature.
    ///
    /// The parameter list always mirrors `signature`; see
    /// [`docstring::parse`] for how documentation is matched to it.
    pub fn from_doc<F>(
        name: impl Into<String>,
        doc: &str,
        signature: Vec<SignatureParam>,
        handler: F,
    ) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let parsed = docstring::parse(doc, Some(signature.as_slice()));
        Self {
            name: name.into(),
            description: parsed.description,
            parameters: parsed.parameters,
            return_description: parsed.return_description,
            code_example: parsed.code_example,
            examples: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Build a tool from already structured metadata.
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParameterSpec>,
        return_description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            return_description: return_description.into(),
            code_example: String::new(),
            examples: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Rename the tool, e.g. to register it under an alias.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_code_example(mut self, code: impl Into<String>) -> Self {
        self.code_example = code.into();
        self
    }

    pub fn with_example(mut self, example: ToolExample) -> Self {
        self.examples.push(example);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn return_description(&self) -> &str {
        &self.return_description
    }

    pub fn code_example(&self) -> &str {
        &self.code_example
    }

    pub fn examples(&self) -> &[ToolExample] {
        &self.examples
    }

    /// JSON schema describing the tool's arguments object.
    pub fn parameters_schema(&self) -> SchemaObject {
        let mut object = ObjectValidation::default();
        for param in &self.parameters {
            let schema = SchemaObject {
                instance_type: param.kind().instance_type().map(Into::into),
                metadata: (!param.description.is_empty()).then(|| {
                    Box::new(Metadata {
                        description: Some(param.description.clone()),
                        ..Default::default()
                    })
                }),
                ..Default::default()
            };
            object
                .properties
                .insert(param.name.clone(), Schema::Object(schema));
            if !param.is_optional() {
                object.required.insert(param.name.clone());
            }
        }

        SchemaObject {
            instance_type: Some(InstanceType::Object.into()),
            object: Some(Box::new(object)),
            ..Default::default()
        }
    }

    /// Coerce `arguments` to the documented types and run the handler.
    ///
    /// Errors and panics raised by the handler are both returned as
    /// [`ToolError`]; nothing escapes this call.
    pub fn invoke(&self, arguments: Arguments) -> Result<Value, ToolError> {
        let arguments = self.coerce_arguments(arguments);
        let shown = Value::Object(arguments.clone());
        debug!(tool = %self.name, arguments = %shown, "Invoking tool");

        match catch_unwind(AssertUnwindSafe(|| (self.handler)(&arguments))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ToolError::Panicked(message))
            }
        }
    }

    fn coerce_arguments(&self, arguments: Arguments) -> Arguments {
        arguments
            .into_iter()
            .map(|(name, value)| {
                let value = match self.parameters.iter().find(|p| p.name == name) {
                    Some(param) => param.kind().coerce(value),
                    None => value,
                };
                (name, value)
            })
            .collect()
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("return_description", &self.return_description)
            .field("code_example", &self.code_example)
            .field("examples", &self.examples)
            .finish_non_exhaustive()
    }
}

/// Deserialize argument `name` for a generated handler.
///
/// A missing argument is read as `null`, so `Option<T>` parameters may be
/// omitted by the model.
pub fn take_argument<T: DeserializeOwned>(arguments: &Arguments, name: &str) -> Result<T, ToolError> {
    match arguments.get(name) {
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| ToolError::InvalidArgument {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => serde_json::from_value(Value::Null)
            .map_err(|_| ToolError::MissingArgument(name.to_string())),
    }
}

/// Serialize a handler's return value.
pub fn to_output<T: Serialize>(output: T) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(|e| ToolError::Failed(format!("unserializable result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adder() -> Tool {
        Tool::from_doc(
            "add",
            "Add two numbers.\n\nArgs:\n    a (int): left\n    b (int): right",
            vec![SignatureParam::typed("a", "i64"), SignatureParam::typed("b", "i64")],
            |args| {
                let a: i64 = take_argument(args, "a")?;
                let b: i64 = take_argument(args, "b")?;
                to_output(a + b)
            },
        )
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn string_arguments_are_coerced() {
        let result = adder().invoke(args(json!({"a": "2", "b": 3}))).unwrap();
        assert_eq!(result, json!(5));
    }

    #[test]
    fn unconvertible_arguments_pass_through() {
        let err = adder().invoke(args(json!({"a": "two", "b": 3}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref name, .. } if name == "a"));
    }

    #[test]
    fn missing_arguments_are_reported() {
        let err = adder().invoke(args(json!({"a": 1}))).unwrap_err();
        assert_eq!(err, ToolError::MissingArgument("b".to_string()));
    }

    #[test]
    fn optional_arguments_may_be_omitted() {
        let value: Option<String> = take_argument(&Arguments::new(), "unit").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn panics_become_errors() {
        let tool = Tool::new("boom", "Always panics", vec![], "", |_| panic!("kaboom"));
        let err = tool.invoke(Arguments::new()).unwrap_err();
        assert_eq!(err, ToolError::Panicked("kaboom".to_string()));
    }

    #[test]
    fn value_kind_classification() {
        assert_eq!(ValueKind::from_type_hint("int"), ValueKind::Integer);
        assert_eq!(ValueKind::from_type_hint("Option<u32>"), ValueKind::Integer);
        assert_eq!(ValueKind::from_type_hint("float, optional"), ValueKind::Float);
        assert_eq!(ValueKind::from_type_hint("&str"), ValueKind::Text);
        assert_eq!(ValueKind::from_type_hint("Vec<String>"), ValueKind::List);
        assert_eq!(ValueKind::from_type_hint("dict"), ValueKind::Object);
        assert_eq!(ValueKind::from_type_hint("datetime.date"), ValueKind::Any);
    }

    #[test]
    fn optional_generic_hints_keep_their_inner_type() {
        assert_eq!(
            ValueKind::from_type_hint("Option<HashMap<String,i64>>"),
            ValueKind::Object
        );
        assert_eq!(
            ValueKind::from_type_hint("Option<HashMap<String, i64>>"),
            ValueKind::Object
        );
        assert_eq!(ValueKind::from_type_hint("tuple(int, int)"), ValueKind::List);
        assert_eq!(ValueKind::from_type_hint("dict, optional"), ValueKind::Object);
    }

    #[test]
    fn coercion_is_best_effort() {
        assert_eq!(ValueKind::Boolean.coerce(json!("Yes")), json!(true));
        assert_eq!(ValueKind::Float.coerce(json!("2.5")), json!(2.5));
        assert_eq!(ValueKind::List.coerce(json!("[1, 2]")), json!([1, 2]));
        assert_eq!(ValueKind::List.coerce(json!("{}")), json!("{}"));
        assert_eq!(ValueKind::Text.coerce(json!(42)), json!("42"));
        assert_eq!(ValueKind::Any.coerce(json!("x")), json!("x"));
    }

    #[test]
    fn schema_lists_required_parameters() {
        let schema = serde_json::to_value(adder().parameters_schema()).unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["a"]["type"], "integer");
        assert_eq!(schema["properties"]["a"]["description"], "left");
        assert_eq!(schema["required"], json!(["a", "b"]));
    }
}
