//! Environment-driven application configuration.
//!
//! Every knob has a stated default so the service boots with nothing but
//! `GEMINI_API_KEY` and `API_KEYS` set. Values are read once at startup;
//! there is no hot reload.

use std::env;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Condei";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "info,condei_lib=debug".to_string()
}

/// Generation parameters sent with every completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl GenerationParams {
    /// Conservative overrides applied when the fallback model is engaged:
    /// temperature capped at 0.4, output floor of 1024 tokens.
    pub fn conservative(&self) -> Self {
        Self {
            temperature: self.temperature.min(0.4),
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens.max(1024),
        }
    }
}

/// Retry policy for completion calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff capped at `max_delay`: `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        exp.min(self.max_delay)
    }
}

/// Complete service configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Primary Gemini model identifier.
    pub model: String,
    /// Secondary model engaged after the first retryable failure.
    pub fallback_model: String,
    pub generation: GenerationParams,
    pub retry: RetryPolicy,
    /// Sliding rate-limit window.
    pub rate_limit_window: Duration,
    /// Max requests per caller per window.
    pub rate_limit_max: u32,
    /// Allowed CORS origins.
    pub allowed_origins: Vec<String>,
    /// Accepted caller API keys (comma-separated in `API_KEYS`).
    pub api_keys: Vec<String>,
    /// Maximum JSON request body size in bytes.
    pub body_limit_bytes: usize,
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// SQLite path for article history; `:memory:` for ephemeral runs.
    pub history_db_path: String,
}

impl AppConfig {
    /// Resolve configuration from environment variables, falling back to
    /// the documented defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self {
            model: env_string("GEMINI_MODEL", "gemini-2.5-pro"),
            fallback_model: env_string("GEMINI_FALLBACK_MODEL", "gemini-1.5-flash"),
            generation: GenerationParams {
                temperature: env_parse("GEMINI_TEMPERATURE", 0.7),
                top_p: env_parse("GEMINI_TOP_P", 0.95),
                top_k: env_parse("GEMINI_TOP_K", 64),
                max_output_tokens: env_parse("GEMINI_MAX_TOKENS", 24_000),
            },
            retry: RetryPolicy {
                max_attempts: env_parse("RETRY_MAX_RETRIES", 3),
                base_delay: Duration::from_millis(env_parse("RETRY_BASE_DELAY_MS", 1000)),
                max_delay: Duration::from_millis(env_parse("RETRY_MAX_DELAY_MS", 8000)),
            },
            rate_limit_window: Duration::from_millis(env_parse("RATE_LIMIT_WINDOW_MS", 60_000)),
            rate_limit_max: env_parse("RATE_LIMIT_MAX", 60),
            allowed_origins: env_list("ALLOWED_ORIGINS"),
            api_keys: env_list("API_KEYS"),
            body_limit_bytes: env_parse("JSON_BODY_LIMIT", 1_048_576),
            bind_addr: env_string("BIND_ADDR", "0.0.0.0:8080"),
            history_db_path: env_string("HISTORY_DB_PATH", "condei-history.db"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".into(),
            fallback_model: "gemini-1.5-flash".into(),
            generation: GenerationParams {
                temperature: 0.7,
                top_p: 0.95,
                top_k: 64,
                max_output_tokens: 24_000,
            },
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1000),
                max_delay: Duration::from_millis(8000),
            },
            rate_limit_window: Duration::from_millis(60_000),
            rate_limit_max: 60,
            allowed_origins: Vec::new(),
            api_keys: Vec::new(),
            body_limit_bytes: 1_048_576,
            bind_addr: "0.0.0.0:8080".into(),
            history_db_path: ":memory:".into(),
        }
    }
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.fallback_model, "gemini-1.5-flash");
        assert!((config.generation.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.generation.max_output_tokens, 24_000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.rate_limit_max, 60);
        assert_eq!(config.body_limit_bytes, 1_048_576);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
        // Capped beyond the max
        assert_eq!(policy.delay_for(6), Duration::from_millis(8000));
    }

    #[test]
    fn conservative_params_cap_temperature_and_floor_tokens() {
        let params = GenerationParams {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 512,
        };
        let safe = params.conservative();
        assert!((safe.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(safe.max_output_tokens, 1024);
    }

    #[test]
    fn conservative_params_keep_low_temperature() {
        let params = GenerationParams {
            temperature: 0.2,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 4096,
        };
        let safe = params.conservative();
        assert!((safe.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(safe.max_output_tokens, 4096);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
