//! Function tools answered locally for the remote assistant.
//!
//! Two tools, `current_weather` and `current_time`, both wrapping the
//! location client. Any lookup failure is answered with the same
//! `{"error": "City not found"}` payload.

pub mod location;
pub mod time;
pub mod weather;

use std::sync::Arc;
use threadline_core::error::ToolError;
use threadline_core::tool::{ToolRegistry, ToolResult};

pub use location::{LocationData, LocationSource, LookupFailure, OpenWeatherClient, fetch_location};
pub use time::{CurrentTimeTool, format_local_time};
pub use weather::CurrentWeatherTool;

/// Create the registry of tools declared to the assistant.
pub fn default_registry(source: Arc<dyn LocationSource>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CurrentWeatherTool::new(source.clone())));
    registry.register(Box::new(CurrentTimeTool::new(source)));
    registry
}

/// The payload sent back when a place cannot be looked up.
pub(crate) fn city_not_found() -> ToolResult {
    ToolResult {
        call_id: String::new(),
        success: false,
        output: serde_json::json!({"error": "City not found"}).to_string(),
    }
}

pub(crate) fn location_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "location": {"type": "string"}
        },
        "required": ["location"]
    })
}

pub(crate) fn location_argument(arguments: &serde_json::Value) -> Result<&str, ToolError> {
    arguments["location"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'location' argument".into()))
}
