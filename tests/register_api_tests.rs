use serde::{Deserialize, Serialize};
use serde_json::json;

use ai_api::{register_api, ParameterSpec, Registry, ToolError};

/// Fetches the most recent filing for a company.
///
/// Args:
///     website (str): The full url
///
/// Returns:
///     str: The filing text
#[register_api]
fn fetch_filing(website: String) -> String {
    format!("filing from {}", website)
}

/// Returns a random number between low and high
///
/// Args:
///     low (int): The lowest possible number
///     high (int): The highest possible number
///
/// Returns:
///     int: A random number between low and high
#[register_api(name = "roll")]
fn get_random_number(low: i64, high: i64) -> i64 {
    (low + high) / 2
}

/// Divide two numbers.
///
/// # Arguments
/// * `numerator` - The dividend
/// * `denominator` - The divisor, must not be zero
#[register_api]
fn divide(numerator: f64, denominator: f64) -> Result<f64, String> {
    if denominator == 0.0 {
        Err("division by zero".to_string())
    } else {
        Ok(numerator / denominator)
    }
}

/// Greets someone.
///
/// Args:
///     name (str): Who to greet
///     greeting (str, optional): Defaults to "Hello"
#[register_api]
pub fn greet(name: String, greeting: Option<String>) -> String {
    format!("{}, {}!", greeting.unwrap_or_else(|| "Hello".to_string()), name)
}

#[derive(Debug, Serialize, Deserialize)]
struct Position {
    ticker: String,
    quantity: u32,
}

/// Market value of a portfolio.
///
/// Args:
///     positions (list): Ticker and quantity pairs
#[register_api]
fn portfolio_value(positions: Vec<Position>) -> u32 {
    positions.iter().map(|p| p.quantity * 10).sum()
}

/// Current server time.
#[register_api]
fn now() -> &'static str {
    "12:00"
}

#[test]
fn doc_comment_becomes_parameter_specs() {
    let tool = fetch_filing_api();

    assert_eq!(tool.name(), "fetch_filing");
    assert_eq!(tool.description(), "Fetches the most recent filing for a company.");
    assert_eq!(
        tool.parameters(),
        [ParameterSpec::new("website", "str", "The full url")]
    );
    assert_eq!(tool.return_description(), "str: The filing text");
}

#[test]
fn parameter_count_matches_signature() {
    for (tool, expected) in [
        (fetch_filing_api(), 1),
        (get_random_number_api(), 2),
        (divide_api(), 2),
        (greet_api(), 2),
        (portfolio_value_api(), 1),
        (now_api(), 0),
    ] {
        assert_eq!(tool.parameters().len(), expected, "{}", tool.name());
    }
}

#[test]
fn rustdoc_arguments_fall_back_to_rust_types() {
    let tool = divide_api();
    assert_eq!(
        tool.parameters(),
        [
            ParameterSpec::new("numerator", "f64", "The dividend"),
            ParameterSpec::new("denominator", "f64", "The divisor, must not be zero"),
        ]
    );
}

#[test]
fn explicit_name_overrides_function_name() {
    let mut registry = Registry::new();
    registry.register(get_random_number_api()).unwrap();

    assert!(registry.lookup("roll").is_ok());
    assert!(registry.lookup("get_random_number").is_err());
}

#[test]
fn generated_handler_calls_the_function() {
    let args = json!({"low": 1, "high": "9"}).as_object().cloned().unwrap();
    assert_eq!(get_random_number_api().invoke(args).unwrap(), json!(5));

    let args = json!({"name": "Ada"}).as_object().cloned().unwrap();
    assert_eq!(greet_api().invoke(args).unwrap(), json!("Hello, Ada!"));

    let args = json!({"positions": [{"ticker": "AAPL", "quantity": 3}]})
        .as_object()
        .cloned()
        .unwrap();
    assert_eq!(portfolio_value_api().invoke(args).unwrap(), json!(30));

    assert_eq!(now_api().invoke(Default::default()).unwrap(), json!("12:00"));
}

#[test]
fn generated_handler_reports_failures() {
    let args = json!({"numerator": 1.0, "denominator": 0.0}).as_object().cloned().unwrap();
    assert_eq!(
        divide_api().invoke(args).unwrap_err(),
        ToolError::Failed("division by zero".to_string())
    );

    let err = fetch_filing_api().invoke(Default::default()).unwrap_err();
    assert_eq!(err, ToolError::MissingArgument("website".to_string()));
}

#[test]
fn the_function_itself_is_untouched() {
    assert_eq!(get_random_number(2, 4), 3);
    assert_eq!(divide(1.0, 4.0), Ok(0.25));
}
