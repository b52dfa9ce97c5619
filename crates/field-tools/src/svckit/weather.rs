//! Weather tools
//!
//! `lookup_coordinates` → `lookup_temperature` → `suggest_clothing` is the
//! chain the agent walks for "what should I wear in <city>?".

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use agent_core::{
    AgentError, Result as CoreResult, Tool, ToolCall, ToolSchema, tool::ParameterSchema,
};

use crate::model::ClothingBand;
use crate::source::{GeoCoder, WeatherSource};

fn number_arg(call: &ToolCall, name: &str) -> CoreResult<f64> {
    call.arguments
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| AgentError::ToolExecution(format!("'{name}' must be a number")))
}

/// City name to latitude/longitude
pub struct LookupCoordinatesTool {
    geocoder: Arc<dyn GeoCoder>,
}

impl LookupCoordinatesTool {
    pub fn new(geocoder: Arc<dyn GeoCoder>) -> Self {
        Self { geocoder }
    }
}

#[async_trait]
impl Tool for LookupCoordinatesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "lookup_coordinates".into(),
            description: "Get the latitude and longitude of a city. Call this before lookup_temperature.".into(),
            parameters: vec![ParameterSchema::required(
                "city",
                "string",
                "City name, e.g. 'Anchorage'",
            )],
            category: Some("weather".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        let city = call.arguments.get("city").and_then(Value::as_str).unwrap_or_default();
        tracing::debug!(city, source = self.geocoder.name(), "Geocoding");
        let place = self.geocoder.locate(city).await?;
        Ok(serde_json::to_value(place)?)
    }
}

/// Current temperature in Fahrenheit
pub struct LookupTemperatureTool {
    weather: Arc<dyn WeatherSource>,
}

impl LookupTemperatureTool {
    pub fn new(weather: Arc<dyn WeatherSource>) -> Self {
        Self { weather }
    }
}

#[async_trait]
impl Tool for LookupTemperatureTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "lookup_temperature".into(),
            description: "Get the current temperature in Fahrenheit at a latitude/longitude.".into(),
            parameters: vec![
                ParameterSchema::required("lat", "number", "Latitude"),
                ParameterSchema::required("lon", "number", "Longitude"),
            ],
            category: Some("weather".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        let lat = number_arg(call, "lat")?;
        let lon = number_arg(call, "lon")?;
        let reading = self.weather.current_temperature(lat, lon).await?;
        Ok(serde_json::to_value(reading)?)
    }
}

/// What to wear at a given temperature. Pure, no I/O.
pub struct SuggestClothingTool;

#[async_trait]
impl Tool for SuggestClothingTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "suggest_clothing".into(),
            description: "Suggest clothing for a temperature in Fahrenheit.".into(),
            parameters: vec![ParameterSchema::required(
                "temperature_f",
                "number",
                "Temperature in Fahrenheit",
            )],
            category: Some("weather".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<Value> {
        let temperature_f = number_arg(call, "temperature_f")?;
        let band = ClothingBand::for_temperature(temperature_f);
        Ok(json!({
            "temperature_f": temperature_f,
            "band": band,
            "suggestion": band.suggestion(),
        }))
    }
}
