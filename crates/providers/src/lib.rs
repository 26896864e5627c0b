//! Assistant service implementations for Threadline.
//!
//! All backends implement the `threadline_core::AssistantService` trait.
//! Azure OpenAI and OpenAI share one HTTP client; they differ only in base
//! URL layout and authentication.

pub mod assistants;

pub use assistants::AssistantsClient;

use threadline_config::AppConfig;
use threadline_core::error::ProviderError;

/// Build the assistant service client described by the configuration.
///
/// Expects a validated config; a missing key or endpoint is still reported
/// as an error here.
pub fn build_from_config(config: &AppConfig) -> Result<AssistantsClient, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::AuthenticationFailed("no API key configured".into()))?;

    match config.backend.as_str() {
        "openai" => Ok(match &config.endpoint {
            Some(base_url) => AssistantsClient::openai_compatible(base_url, api_key),
            None => AssistantsClient::openai(api_key),
        }),
        _ => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                ProviderError::AuthenticationFailed("no Azure endpoint configured".into())
            })?;
            Ok(AssistantsClient::azure(endpoint, api_key, &config.api_version))
        }
    }
}
