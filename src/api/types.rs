//! Shared types for the API layer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware. Wraps `CoreState`
/// plus the key set and rate limiter.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub api_keys: Arc<HashSet<[u8; 32]>>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>, config: &AppConfig) -> Self {
        let api_keys = config.api_keys.iter().map(|k| hash_key(k)).collect();
        Self {
            core,
            api_keys: Arc::new(api_keys),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
                config.rate_limit_window,
                config.rate_limit_max,
            ))),
        }
    }
}

/// Authenticated caller context, injected into request extensions by the
/// auth middleware. The id is a stable hash prefix of the presented key,
/// used only for diagnostics and rate limiting.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub caller_id: String,
}

/// Hash an API key with SHA-256; raw keys are never stored or compared.
pub fn hash_key(key: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

/// Short hex identity derived from a key hash, safe to log.
pub fn caller_id_for(key_hash: &[u8; 32]) -> String {
    key_hash
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}

// ═══════════════════════════════════════════════════════════
// Rate limiter — per-caller sliding window
// ═══════════════════════════════════════════════════════════

/// Sliding-window rate limiter, one window per caller.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: HashMap::new(),
            window,
            max_requests,
        }
    }

    /// Check whether a caller is within its limit. Returns `Ok(())` or
    /// `Err(retry_after_secs)` when exceeded.
    pub fn check(&mut self, caller_id: &str) -> Result<(), u64> {
        let now = Instant::now();
        let entries = self.windows.entry(caller_id.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < self.window);

        if entries.len() as u32 >= self.max_requests {
            return Err(self.window.as_secs().max(1));
        }
        entries.push(now);
        Ok(())
    }
}
