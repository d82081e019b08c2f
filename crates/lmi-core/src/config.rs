use crate::app_config::{AppConfig, Environment};
use crate::records::MAX_RESULTS_LIMIT;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank secrets are treated as unset so `.env` templates with
    // `APIFY_TOKEN=` don't produce a client that fails on first use.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("LMI_ENV", "development"));

    let bind_addr = or_default("LMI_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("LMI_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("LMI_LOG_LEVEL", "info");
    let user_agent = or_default("LMI_USER_AGENT", "lmi/0.1 (local-market-intelligence)");

    let apify_token = optional("APIFY_TOKEN");
    let apify_base_url = or_default("LMI_APIFY_BASE_URL", "https://api.apify.com");
    let apify_actor = or_default("LMI_APIFY_ACTOR", "apify~google-maps-scraper");
    if apify_actor.trim().is_empty() {
        return Err(invalid("LMI_APIFY_ACTOR", "must be non-empty".to_string()));
    }

    let scrape_job_timeout_secs = parse_u64("LMI_SCRAPE_JOB_TIMEOUT_SECS", "300")?;
    let request_timeout_secs = parse_u64("LMI_REQUEST_TIMEOUT_SECS", "90")?;
    let max_retries = parse_u32("LMI_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("LMI_RETRY_BACKOFF_BASE_MS", "1000")?;

    let default_max_results = parse_u32("LMI_DEFAULT_MAX_RESULTS", "150")?;
    if default_max_results == 0 || default_max_results > MAX_RESULTS_LIMIT {
        return Err(invalid(
            "LMI_DEFAULT_MAX_RESULTS",
            format!("must be between 1 and {MAX_RESULTS_LIMIT}"),
        ));
    }

    let gemini_api_key = optional("GEMINI_API_KEY");
    let gemini_base_url = or_default(
        "LMI_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    );
    let gemini_model = or_default("LMI_GEMINI_MODEL", "gemini-1.5-flash");

    let field_map_path = optional("LMI_FIELD_MAP_PATH").map(PathBuf::from);
    let search_rate_limit_per_minute = parse_usize("LMI_SEARCH_RATE_LIMIT_PER_MINUTE", "10")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        user_agent,
        apify_token,
        apify_base_url,
        apify_actor,
        scrape_job_timeout_secs,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        default_max_results,
        gemini_api_key,
        gemini_base_url,
        gemini_model,
        field_map_path,
        search_rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
