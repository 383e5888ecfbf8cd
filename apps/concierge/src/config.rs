use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::recommendations::pagination::DedupPolicy;

const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const DEFAULT_SESSION_IDLE_TTL_SECS: &str = "1800";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub geocoder_url: String,
    pub load_more_dedup: DedupPolicy,
    /// Sessions untouched for this long are evicted.
    pub session_idle_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            geocoder_url: std::env::var("GEOCODER_URL")
                .unwrap_or_else(|_| DEFAULT_GEOCODER_URL.to_string()),
            load_more_dedup: parse_dedup_policy(
                &std::env::var("LOAD_MORE_DEDUP").unwrap_or_else(|_| "keep".to_string()),
            )?,
            session_idle_ttl: parse_idle_ttl(
                &std::env::var("SESSION_IDLE_TTL_SECS")
                    .unwrap_or_else(|_| DEFAULT_SESSION_IDLE_TTL_SECS.to_string()),
            )?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_dedup_policy(raw: &str) -> Result<DedupPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "keep" | "" => Ok(DedupPolicy::KeepAll),
        "skip" => Ok(DedupPolicy::SkipKnown),
        other => bail!("LOAD_MORE_DEDUP must be 'keep' or 'skip', got '{other}'"),
    }
}

fn parse_idle_ttl(raw: &str) -> Result<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .context("SESSION_IDLE_TTL_SECS must be a whole number of seconds")?;
    if secs == 0 {
        bail!("SESSION_IDLE_TTL_SECS must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}
