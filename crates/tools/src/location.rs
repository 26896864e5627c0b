//! Location data client: current conditions and UTC offset for a place name.
//!
//! One HTTP GET per lookup against the OpenWeather current-weather endpoint.
//! No retry, no caching. Callers only ever see `Some`/`None` through
//! [`fetch_location`]; the [`LookupFailure`] reason is logged and kept
//! inspectable for tests.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// Path of the current-weather endpoint under the provider's base URL.
const CURRENT_WEATHER_PATH: &str = "data/2.5/weather";

/// What a successful lookup yields.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationData {
    /// Current temperature in degrees Celsius
    pub temperature_c: f64,

    /// Short condition text, e.g. "light rain"
    pub description: String,

    /// Offset of the place's local time from UTC, in seconds
    pub utc_offset_secs: i32,
}

/// Why a lookup produced nothing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupFailure {
    #[error("No weather API key configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Weather provider returned status {0}")]
    Status(u16),

    #[error("Malformed weather response: {0}")]
    Malformed(String),
}

/// A source of location data.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<LocationData, LookupFailure>;
}

/// Look a place up, collapsing every failure to `None`.
pub async fn fetch_location(source: &dyn LocationSource, name: &str) -> Option<LocationData> {
    match source.lookup(name).await {
        Ok(data) => Some(data),
        Err(reason) => {
            warn!(location = name, %reason, "Location lookup failed");
            None
        }
    }
}

/// OpenWeather-backed location source.
pub struct OpenWeatherClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LocationSource for OpenWeatherClient {
    async fn lookup(&self, name: &str) -> Result<LocationData, LookupFailure> {
        let api_key = self.api_key.as_deref().ok_or(LookupFailure::MissingApiKey)?;

        let url = format!("{}/{CURRENT_WEATHER_PATH}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", name), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| LookupFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupFailure::Status(status.as_u16()));
        }

        let body: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| LookupFailure::Malformed(e.to_string()))?;

        let description = body
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| LookupFailure::Malformed("empty 'weather' list".into()))?;

        Ok(LocationData {
            temperature_c: body.main.temp,
            description,
            utc_offset_secs: body.timezone,
        })
    }
}

// --- API types (internal) ---

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainBlock,
    weather: Vec<WeatherBlock>,
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherBlock {
    description: String,
}
