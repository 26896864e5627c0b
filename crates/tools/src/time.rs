//! Current local time tool, backed by a [`LocationSource`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use threadline_core::error::ToolError;
use threadline_core::tool::{Tool, ToolResult};

use crate::location::{LocationSource, fetch_location};
use crate::{city_not_found, location_argument, location_schema};

/// `YYYY-MM-DD hh:mm AM/PM`
const TIME_FORMAT: &str = "%Y-%m-%d %I:%M %p";

pub struct CurrentTimeTool {
    source: Arc<dyn LocationSource>,
}

impl CurrentTimeTool {
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self { source }
    }
}

/// Format `now` shifted by a UTC offset as a 12-hour local timestamp.
pub fn format_local_time(now: DateTime<Utc>, utc_offset_secs: i32) -> String {
    let local = now + Duration::seconds(i64::from(utc_offset_secs));
    local.format(TIME_FORMAT).to_string()
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get current local time."
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
            "current_time": format_local_time(Utc::now(), data.utc_offset_secs),
        });

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: output.to_string(),
        })
    }
}
