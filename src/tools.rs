//! Built-in tools exposed to the model

use async_trait::async_trait;
use okulo_llm::{Result, Tool, ToolDefinition};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Current-weather lookup.
///
/// No weather service is wired in yet; the tool answers with a fixed
/// reading so the call round trip can be exercised end to end.
pub struct GetWeather;

#[derive(Deserialize)]
struct WeatherArgs {
    location: String,
    #[serde(default)]
    unit: Option<String>,
}

#[async_trait]
impl Tool for GetWeather {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_weather",
            "Get the current weather in a given location",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "The city and state, e.g. San Francisco, CA",
                    },
                    "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]},
                },
                "required": ["location"],
            }),
        )
    }

    async fn invoke(&self, arguments: &str) -> Result<String> {
        let args: WeatherArgs =
            serde_json::from_str(arguments).unwrap_or_else(|_| WeatherArgs {
                location: "here".to_string(),
                unit: None,
            });
        let unit = args.unit.as_deref().unwrap_or("celsius");
        info!(location = %args.location, unit, "weather requested");
        Ok(json!({"result": "24 C"}).to_string())
    }
}

/// Room light switch
pub struct SwitchLight;

#[async_trait]
impl Tool for SwitchLight {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "switch_light",
            "switch room light on",
            json!({"type": "object", "properties": {}}),
        )
    }

    async fn invoke(&self, _arguments: &str) -> Result<String> {
        info!("light on");
        Ok(json!({"result": "light turn on"}).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_weather_reports_reading() {
        let out = GetWeather
            .invoke(r#"{"location": "Tashkent", "unit": "celsius"}"#)
            .await
            .unwrap();
        assert!(out.contains("24 C"));
    }

    #[tokio::test]
    async fn test_switch_light_reports_state() {
        let out = SwitchLight.invoke("{}").await.unwrap();
        assert!(out.contains("light turn on"));
    }
}
