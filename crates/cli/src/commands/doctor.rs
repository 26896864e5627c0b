//! `threadline doctor`: diagnose configuration.

use std::path::Path;
use threadline_config::{AppConfig, ENV_API_KEY, ENV_ENDPOINT, ENV_WEATHER_KEY};

pub async fn run(secrets: Option<&Path>) -> anyhow::Result<()> {
    println!("🩺 Threadline Doctor — Configuration Diagnostics");
    println!("================================================\n");

    let mut issues = 0;

    match AppConfig::locate_secrets_file(secrets) {
        Some(path) => println!("  ✅ Secrets file: {}", path.display()),
        None => match secrets {
            Some(path) => {
                println!("  ❌ Secrets file not found: {}", path.display());
                issues += 1;
            }
            None => println!("  ⚠️  No secrets file, using environment only"),
        },
    }

    let config = match AppConfig::load_unvalidated(secrets) {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 blocking issue found.");
            return Ok(());
        }
    };

    if config.api_key.is_some() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set {ENV_API_KEY} or api_key in secrets.toml");
        issues += 1;
    }

    match (&config.endpoint, config.backend.as_str()) {
        (Some(endpoint), _) => println!("  ✅ Endpoint: {endpoint}"),
        (None, "openai") => println!("  ✅ Endpoint: OpenAI default"),
        (None, _) => {
            println!("  ❌ No endpoint — set {ENV_ENDPOINT} or endpoint in secrets.toml");
            issues += 1;
        }
    }

    if config.weather_enabled() {
        println!("  ✅ Weather API key configured");
    } else {
        println!("  ⚠️  No weather key ({ENV_WEATHER_KEY}) — weather and time lookups will fail");
    }

    if let Some(path) = &config.reference_document {
        if path.exists() {
            println!("  ✅ Reference document: {}", path.display());
        } else {
            println!("  ❌ Reference document missing: {}", path.display());
            issues += 1;
        }
    }

    // Secret problems are already reported above
    if issues == 0
        && let Err(e) = config.validate()
    {
        println!("  ❌ {e}");
        issues += 1;
    }

    println!("  ℹ️  Backend {} · model {} · api-version {}", config.backend, config.model, config.api_version);

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
