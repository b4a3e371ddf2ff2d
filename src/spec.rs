//! Explicit API specifications.
//!
//! An alternative to doc comments: the tool's documentation and few-shot
//! examples are written out as data, typically loaded from JSON.
//!
//! ```json
//! {
//!   "name": "risk_decomposition",
//!   "description": "Runs risk decomposition for an equities portfolio.",
//!   "args": ["portfolio (list): tickers and quantities", ["date", "str", "The date"]],
//!   "code_example": "risk_decomposition(portfolio=portfolio, date=today)",
//!   "results_description": "Dollar volatility per factor.",
//!   "example_results": ["{\"Beta_Dollar_Vol\": 950000}"],
//!   "example_query": ["What are my factor exposures?"],
//!   "example_response": ["The largest exposure is Beta."],
//!   "example_kwargs": [{"portfolio": [["AAPL", 100]], "date": "2024-01-02"}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::docstring::{self, dedent};
use crate::tools::{Arguments, ParameterSpec, Tool, ToolError, ToolExample};

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("API spec is missing a name")]
    MissingName,

    #[error("API spec `{name}` has no examples; at least one example query, result, response and kwargs set is required")]
    NoExamples { name: String },

    #[error("API spec `{name}` example lists differ in length (results {results}, queries {queries}, responses {responses}, kwargs {kwargs})")]
    ExampleLengthMismatch {
        name: String,
        results: usize,
        queries: usize,
        responses: usize,
        kwargs: usize,
    },

    #[error("API spec `{name}` example_kwargs[{index}] must be a JSON object")]
    KwargsNotObject { name: String, index: usize },

    #[error("API spec `{name}` has an unreadable arg `{arg}`, expected `name (type): description`")]
    InvalidArg { name: String, arg: String },

    #[error("registered name `{expected}` does not match spec name `{found}`")]
    NameMismatch { expected: String, found: String },

    #[error("invalid API spec JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One argument entry: either a documentation line or a
/// `[name, type, description]` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgSpec {
    Triple(String, String, String),
    Line(String),
}

/// Full documentation of a tool, with few-shot examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgSpec>,
    pub code_example: String,
    pub results_description: String,
    pub example_results: Vec<Value>,
    pub example_query: Vec<String>,
    pub example_response: Vec<String>,
    pub example_kwargs: Vec<Value>,
}

impl ApiSpec {
    /// Parse and validate a JSON spec.
    pub fn from_json_str(json: &str) -> Result<Self, SpecError> {
        let spec: ApiSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check the spec is complete and its example lists line up.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.name.trim().is_empty() {
            return Err(SpecError::MissingName);
        }

        let lengths = [
            self.example_results.len(),
            self.example_query.len(),
            self.example_response.len(),
            self.example_kwargs.len(),
        ];
        if lengths.iter().any(|&len| len != lengths[0]) {
            return Err(SpecError::ExampleLengthMismatch {
                name: self.name.clone(),
                results: lengths[0],
                queries: lengths[1],
                responses: lengths[2],
                kwargs: lengths[3],
            });
        }
        if lengths[0] == 0 {
            return Err(SpecError::NoExamples {
                name: self.name.clone(),
            });
        }

        if let Some(index) = self.example_kwargs.iter().position(|k| !k.is_object()) {
            return Err(SpecError::KwargsNotObject {
                name: self.name.clone(),
                index,
            });
        }

        self.parameters().map(|_| ())
    }

    /// Parameters in the order the spec lists them.
    pub fn parameters(&self) -> Result<Vec<ParameterSpec>, SpecError> {
        self.args
            .iter()
            .map(|arg| match arg {
                ArgSpec::Triple(name, ty, desc) => Ok(ParameterSpec::new(name.trim(), ty.trim(), desc.trim())),
                ArgSpec::Line(line) => docstring::parse(&format!("Args:\n    {}", line.trim()), None)
                    .parameters
                    .into_iter()
                    .next()
                    .ok_or_else(|| SpecError::InvalidArg {
                        name: self.name.clone(),
                        arg: line.clone(),
                    }),
            })
            .collect()
    }

    /// Few-shot examples, pairing the four example lists by index.
    pub fn examples(&self) -> Vec<ToolExample> {
        self.example_query
            .iter()
            .zip(&self.example_kwargs)
            .zip(&self.example_results)
            .zip(&self.example_response)
            .map(|(((query, kwargs), result), response)| ToolExample {
                query: query.trim().to_string(),
                arguments: kwargs.as_object().cloned().unwrap_or_default(),
                result: match result {
                    Value::String(s) => dedent(s).join("\n"),
                    other => other.to_string(),
                },
                response: response.trim().to_string(),
            })
            .collect()
    }

    /// Build a tool from this spec, registering it under the spec's name.
    pub fn into_tool<F>(self, handler: F) -> Result<Tool, SpecError>
    where
        F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.validate()?;
        let parameters = self.parameters()?;
        let examples = self.examples();

        let mut tool = Tool::new(
            self.name.trim(),
            self.description.trim(),
            parameters,
            dedent(&self.results_description).join("\n"),
            handler,
        )
        .with_code_example(dedent(&self.code_example).join("\n"));
        for example in examples {
            tool = tool.with_example(example);
        }
        Ok(tool)
    }

    /// Like [`ApiSpec::into_tool`], but first checks the spec describes the
    /// tool registered as `name`.
    pub fn into_tool_named<F>(self, name: &str, handler: F) -> Result<Tool, SpecError>
    where
        F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        if self.name.trim() != name {
            return Err(SpecError::NameMismatch {
                expected: name.to_string(),
                found: self.name,
            });
        }
        self.into_tool(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::to_output;
    use serde_json::json;

    fn risk_spec() -> serde_json::Value {
        json!({
            "name": "risk_decomposition",
            "description": "Runs risk decomposition for an equities portfolio.",
            "code_example": "\n        portfolio = [(\"AAPL\", 100)]\n        risk_decomposition(portfolio=portfolio)\n        ",
            "args": [
                "portfolio (list): A list of tuples containing the ticker and the quantity",
                ["date", "datetime.date", "The date to run the risk decomposition for"]
            ],
            "results_description": "\n    A dict mapping each factor to the dollar volatility.\n    Units are in dollars.",
            "example_results": [{"Beta_Dollar_Vol": 950000}],
            "example_query": ["What are my factor exposures?"],
            "example_response": ["The largest factor exposure is Beta."],
            "example_kwargs": [{"portfolio": [["AAPL", 100]], "date": "2024-01-02"}]
        })
    }

    #[test]
    fn valid_spec_becomes_a_tool() {
        let spec = ApiSpec::from_json_str(&risk_spec().to_string()).unwrap();
        let tool = spec.into_tool(|_| to_output("ok")).unwrap();

        assert_eq!(tool.name(), "risk_decomposition");
        assert_eq!(
            tool.parameters(),
            [
                ParameterSpec::new(
                    "portfolio",
                    "list",
                    "A list of tuples containing the ticker and the quantity"
                ),
                ParameterSpec::new("date", "datetime.date", "The date to run the risk decomposition for"),
            ]
        );
        assert_eq!(
            tool.return_description(),
            "A dict mapping each factor to the dollar volatility.\nUnits are in dollars."
        );
        assert_eq!(
            tool.code_example(),
            "portfolio = [(\"AAPL\", 100)]\nrisk_decomposition(portfolio=portfolio)"
        );
        assert_eq!(tool.examples().len(), 1);
        assert_eq!(tool.examples()[0].result, r#"{"Beta_Dollar_Vol":950000}"#);
    }

    #[test]
    fn example_lists_must_line_up() {
        let mut value = risk_spec();
        value["example_query"] = json!(["one", "two"]);
        let err = ApiSpec::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, SpecError::ExampleLengthMismatch { queries: 2, .. }));
    }

    #[test]
    fn at_least_one_example_is_required() {
        let mut value = risk_spec();
        for key in ["example_results", "example_query", "example_response", "example_kwargs"] {
            value[key] = json!([]);
        }
        let err = ApiSpec::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, SpecError::NoExamples { .. }));
    }

    #[test]
    fn kwargs_must_be_objects() {
        let mut value = risk_spec();
        value["example_kwargs"] = json!(["portfolio=1"]);
        let err = ApiSpec::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, SpecError::KwargsNotObject { index: 0, .. }));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut value = risk_spec();
        value.as_object_mut().unwrap().remove("example_response");
        assert!(matches!(
            ApiSpec::from_json_str(&value.to_string()),
            Err(SpecError::Json(_))
        ));
    }

    #[test]
    fn unreadable_args_are_rejected() {
        let mut value = risk_spec();
        value["args"] = json!(["???"]);
        let err = ApiSpec::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, SpecError::InvalidArg { .. }));
    }

    #[test]
    fn registered_name_must_match() {
        let spec: ApiSpec = serde_json::from_value(risk_spec()).unwrap();
        let err = spec.into_tool_named("mismatched_name", |_| to_output(())).unwrap_err();
        assert!(matches!(err, SpecError::NameMismatch { .. }));
    }
}
