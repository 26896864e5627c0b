//! Current weather tool, backed by a [`LocationSource`].

use async_trait::async_trait;
use std::sync::Arc;
use threadline_core::error::ToolError;
use threadline_core::tool::{Tool, ToolResult};

use crate::location::{LocationSource, fetch_location};
use crate::{city_not_found, location_argument, location_schema};

pub struct CurrentWeatherTool {
    source: Arc<dyn LocationSource>,
}

impl CurrentWeatherTool {
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for CurrentWeatherTool {
    fn name(&self) -> &str {
        "current_weather"
    }

    fn description(&self) -> &str {
        "Get current weather."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        location_schema()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let location = location_argument(&arguments)?;

        let Some(data) = fetch_location(self.source.as_ref(), location).await else {
            return Ok(city_not_found());
        };

        let output = serde_json::json!({
            "location": location,
            "temperature": round_one_decimal(data.temperature_c),
            "unit": "celsius",
            "description": data.description,
        });

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: output.to_string(),
        })
    }
}

/// Round to one decimal on the exact binary value, ties to even.
fn round_one_decimal(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::OpenWeatherClient;
    use crate::location::test_support::StubSource;

    fn tool() -> CurrentWeatherTool {
        CurrentWeatherTool::new(Arc::new(StubSource::with("Seoul", 21.34, "clear sky", 32400)))
    }

    #[tokio::test]
    async fn reports_rounded_celsius() {
        let result = tool()
            .execute(serde_json::json!({"location": "Seoul"}))
            .await
            .unwrap();

        assert!(result.success);
        let json: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(json["location"], "Seoul");
        assert_eq!(json["temperature"], 21.3);
        assert_eq!(json["unit"], "celsius");
        assert_eq!(json["description"], "clear sky");
    }

    #[tokio::test]
    async fn rounds_stored_value_ties_to_even() {
        for (raw, expected) in [(1.15, 1.1), (21.15, 21.1), (0.15, 0.1), (21.25, 21.2), (-3.25, -3.2)] {
            let tool = CurrentWeatherTool::new(Arc::new(StubSource::with("Oslo", raw, "snow", 3600)));
            let result = tool
                .execute(serde_json::json!({"location": "Oslo"}))
                .await
                .unwrap();
            let json: serde_json::Value = serde_json::from_str(&result.output).unwrap();
            assert_eq!(json["temperature"], expected, "raw {raw}");
        }
    }

    #[tokio::test]
    async fn unknown_city_yields_error_sentinel() {
        let result = tool()
            .execute(serde_json::json!({"location": "Atlantis"}))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.output, r#"{"error":"City not found"}"#);
    }

    #[tokio::test]
    async fn every_lookup_failure_yields_same_sentinel() {
        let sources: [Arc<dyn LocationSource>; 2] = [
            Arc::new(OpenWeatherClient::new("http://127.0.0.1:9", None)),
            Arc::new(OpenWeatherClient::new("http://127.0.0.1:9", Some("owm-key".into()))),
        ];
        for source in sources {
            let result = CurrentWeatherTool::new(source)
                .execute(serde_json::json!({"location": "Seoul"}))
                .await
                .unwrap();
            assert!(!result.success);
            assert_eq!(result.output, r#"{"error":"City not found"}"#);
        }
    }

    #[tokio::test]
    async fn missing_location_is_invalid_arguments() {
        let err = tool().execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn tool_definition() {
        let def = tool().to_definition();
        assert_eq!(def.name, "current_weather");
        assert_eq!(def.parameters["required"][0], "location");
    }
}
