//! Demo tools registered by the `parley` binary.

use parley_tools::{RegistrationError, ToolRegistry};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// The city to get weather for.
    pub city: String,
}

pub fn get_weather(args: WeatherArgs) -> String {
    let report = match args.city.to_lowercase().as_str() {
        "paris" => "Sunny, 22C",
        "london" => "Overcast, 14C",
        "tokyo" => "Clear skies, 28C",
        "new york" => "Partly cloudy, 18C",
        "mumbai" => "Humid, 33C",
        _ => "No data available",
    };
    format!("Weather in {}: {report}", args.city)
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CalculatorArgs {
    /// The math operation: add, subtract, multiply, divide.
    pub operation: String,
    /// First number.
    pub a: f64,
    /// Second number.
    pub b: f64,
}

pub fn calculate(args: CalculatorArgs) -> Result<String, String> {
    let result = match args.operation.to_lowercase().as_str() {
        "add" => args.a + args.b,
        "subtract" => args.a - args.b,
        "multiply" => args.a * args.b,
        "divide" if args.b == 0.0 => return Err("division by zero".to_string()),
        "divide" => args.a / args.b,
        other => return Err(format!("unknown operation: {other}")),
    };
    Ok(format!(
        "{:.2} {} {:.2} = {result:.2}",
        args.a, args.operation, args.b
    ))
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LookupArgs {
    /// The topic to look up.
    pub topic: String,
}

pub fn lookup_fact(args: LookupArgs) -> String {
    match args.topic.to_lowercase().as_str() {
        "go" => "Go was created at Google in 2009 by Robert Griesemer, Rob Pike, and Ken Thompson."
            .to_string(),
        "rust" => "Rust was first released in 2010 and emphasizes memory safety without garbage collection."
            .to_string(),
        "python" => "Python was created by Guido van Rossum and first released in 1991.".to_string(),
        _ => format!("No facts available for: {}", args.topic),
    }
}

pub fn demo_registry() -> Result<ToolRegistry, RegistrationError> {
    let mut registry = ToolRegistry::new();
    registry.register("get_weather", "Get current weather for a city", get_weather)?;
    registry.register("calculator", "Perform basic math operations", calculate)?;
    registry.register(
        "lookup_fact",
        "Look up facts about programming languages",
        lookup_fact,
    )?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_tools_dispatch_through_registry() {
        let r = demo_registry().expect("registry");
        assert_eq!(r.len(), 3);
        assert_eq!(
            r.execute("get_weather", r#"{"city":"Paris"}"#).await.as_deref(),
            Ok("Weather in Paris: Sunny, 22C")
        );
        assert_eq!(
            r.execute("calculator", r#"{"operation":"multiply","a":6,"b":7}"#)
                .await
                .as_deref(),
            Ok("6.00 multiply 7.00 = 42.00")
        );
        assert!(
            r.execute("lookup_fact", r#"{"topic":"Rust"}"#)
                .await
                .is_ok_and(|s| s.starts_with("Rust was first released"))
        );
    }

    #[tokio::test]
    async fn calculator_reports_failures() {
        let r = demo_registry().expect("registry");
        assert_eq!(
            r.execute("calculator", r#"{"operation":"divide","a":1,"b":0}"#).await,
            Err(parley_tools::ToolError::ExecutionFailed(
                "division by zero".to_string()
            ))
        );
        assert!(
            r.execute("calculator", r#"{"operation":"modulo","a":1,"b":2}"#)
                .await
                .is_err()
        );
    }

    #[test]
    fn unknown_city_has_no_data() {
        assert_eq!(
            get_weather(WeatherArgs {
                city: "Atlantis".to_string()
            }),
            "Weather in Atlantis: No data available"
        );
    }
}
