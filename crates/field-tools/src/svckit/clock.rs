//! Current time tool

use async_trait::async_trait;
use serde_json::{Value, json};

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolSchema, tool::ParameterSchema};

/// Current UTC timestamp for a city. No timezone lookup.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "current_time".into(),
            description: "Get the current time (UTC) for a city.".into(),
            parameters: vec![
                ParameterSchema::required("city", "string", "City name"),
                ParameterSchema {
                    enum_values: Some(vec![json!("iso"), json!("human"), json!("unix")]),
                    ..ParameterSchema::optional(
                        "format",
                        "string",
                        "Output format: 'iso', 'human', or 'unix'",
                        Some(json!("iso")),
                    )
                },
            ],
            category: Some("time".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        let city = call.arguments.get("city").and_then(Value::as_str).unwrap_or_default();
        let format = call.arguments.get("format").and_then(Value::as_str).unwrap_or("iso");

        let now = chrono::Utc::now();
        let timestamp = match format {
            "unix" => now.timestamp().to_string(),
            "human" => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
            _ => now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        };

        Ok(json!({ "city": city, "timestamp_utc": timestamp }))
    }
}
