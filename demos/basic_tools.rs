use ai_api::{register_api, AiApi, AiApiConfig, LogLevel};

// ============================================================================================
// Step 1: Document the Functions
// ============================================================================================
// The doc comment is all the model sees. `Args` entries become the parameter list in the
// tool catalog, in the order of the function signature.

/// Returns a random number between low and high
///
/// Args:
///     low (int): The lowest possible number
///     high (int): The highest possible number
///
/// Returns:
///     int: A random number between low and high
#[register_api]
fn get_random_number(low: i64, high: i64) -> i64 {
    println!("> Tool called: get_random_number({}, {})", low, high);
    // Deterministic enough for a demo.
    low + (high - low) / 3
}

/// Looks up the current weather in a city.
///
/// Args:
///     city (str): The city name
///     unit (str, optional): celsius or fahrenheit, celsius when omitted
///
/// Returns:
///     A JSON object with the temperature and the condition
#[register_api]
fn get_weather(city: String, unit: Option<String>) -> serde_json::Value {
    let unit = unit.unwrap_or_else(|| "celsius".to_string());
    println!("> Tool called: get_weather({}, {})", city, unit);

    // In a real application, you would call an external weather API here.
    serde_json::json!({
        "city": city,
        "temperature": 22,
        "unit": unit,
        "condition": "Sunny"
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ============================================================================================
    // Step 2: Configure and Register
    // ============================================================================================
    let config = AiApiConfig::from_env().with_log_level(LogLevel::Info);
    let mut app = AiApi::new(config)?;
    app.register(get_random_number_api())?;
    app.register(get_weather_api())?;

    println!("Tool catalog:\n{}\n", app.catalog());

    // ============================================================================================
    // Step 3: Ask
    // ============================================================================================
    // Each query either gets a direct answer or exactly one tool call followed by a second
    // request in which the model phrases the answer from the tool result.
    for query in [
        "Give me a random number between 1 and 100",
        "What's the weather like in Tokyo?",
        "Who wrote The Rust Programming Language book?",
    ] {
        let answer = app.execute_query(query).await?;
        println!("User: {}\nAssistant: {}\n", query, answer);
    }

    Ok(())
}
