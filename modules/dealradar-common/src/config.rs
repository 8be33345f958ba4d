use std::env;

use chrono::{Datelike, Utc};

/// Weights for the normalizer's confidence score. Sum to 1.0 so the final
/// score stays in [0, 1] without relying on the clamp.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceWeights {
    pub discount: f32,
    pub recency: f32,
    pub source: f32,
    pub completeness: f32,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            discount: 0.35,
            recency: 0.25,
            source: 0.25,
            completeness: 0.15,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Loaded once at startup; components receive the values they need
/// explicitly and never read the environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,

    // Search API
    pub serper_api_key: String,
    pub search_max_attempts: u32,
    pub search_timeout_secs: u64,
    pub search_budget_secs: u64,
    pub search_max_results: usize,

    // Normalization policy
    pub max_age_months: i64,
    pub cutoff_year: i32,
    pub confidence_weights: ConfidenceWeights,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            serper_api_key: required_env("SERPER_API_KEY"),
            search_max_attempts: env_parse("SEARCH_MAX_ATTEMPTS", 3),
            search_timeout_secs: env_parse("SEARCH_TIMEOUT_SECS", 10),
            search_budget_secs: env_parse("SEARCH_BUDGET_SECS", 45),
            search_max_results: env_parse("SEARCH_MAX_RESULTS", 20),
            max_age_months: env_parse("OFFER_MAX_AGE_MONTHS", 1),
            cutoff_year: env_parse("OFFER_CUTOFF_YEAR", Utc::now().year()),
            confidence_weights: ConfidenceWeights {
                discount: env_parse("CONFIDENCE_W_DISCOUNT", 0.35),
                recency: env_parse("CONFIDENCE_W_RECENCY", 0.25),
                source: env_parse("CONFIDENCE_W_SOURCE", 0.25),
                completeness: env_parse("CONFIDENCE_W_COMPLETENESS", 0.15),
            },
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env_parse("WEB_PORT", 3000),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number, got {raw:?}")),
        Err(_) => default,
    }
}
