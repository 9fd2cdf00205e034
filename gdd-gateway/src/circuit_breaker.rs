//! Per-model cooldowns for the default model chain.
//!
//! A model that answered 429 or 5xx when a stream was opened is skipped by
//! later requests until its cooldown expires, so the next model in the chain
//! is tried first.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::providers::ProviderError;

/// Why a model was placed on cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownReason {
    /// HTTP 429
    RateLimited,
    /// 5xx, including Anthropic's 529 "overloaded"
    ServerError,
}

impl CooldownReason {
    fn cooldown_duration(self) -> Duration {
        match self {
            Self::RateLimited => Duration::from_secs(60 * 60),
            Self::ServerError => Duration::from_secs(5 * 60),
        }
    }

    /// Classify an HTTP status. Client errors other than 429 are not retryable.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(Self::RateLimited),
            500..=599 => Some(Self::ServerError),
            _ => None,
        }
    }

    /// Classify a provider failure, `None` when trying another model would not help.
    pub fn from_error(error: &ProviderError) -> Option<Self> {
        match error {
            ProviderError::HttpError(e) if e.is_timeout() || e.is_connect() => {
                Some(Self::ServerError)
            }
            other => other.status().and_then(Self::from_status),
        }
    }
}

struct CooldownEntry {
    available_at: Instant,
    reason: CooldownReason,
}

/// Shared circuit breaker tracking per-model cooldowns.
///
/// Writes only happen on failures, so readers rarely wait.
pub struct CircuitBreaker {
    states: RwLock<HashMap<String, CooldownEntry>>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Whether `model_id` is off cooldown.
    pub fn is_available(&self, model_id: &str) -> bool {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states
            .get(model_id)
            .is_none_or(|entry| Instant::now() >= entry.available_at)
    }

    /// Put `model_id` on cooldown.
    pub fn record_failure(&self, model_id: &str, reason: CooldownReason) {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        states.insert(
            model_id.to_string(),
            CooldownEntry {
                available_at: Instant::now() + reason.cooldown_duration(),
                reason,
            },
        );
    }

    /// Clear any cooldown for `model_id`.
    pub fn record_success(&self, model_id: &str) {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        states.remove(model_id);
    }

    /// Models from `chain` that are off cooldown, in chain order.
    pub fn available<'a>(&self, chain: &'a [String]) -> Vec<&'a str> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        chain
            .iter()
            .filter(|id| {
                states
                    .get(id.as_str())
                    .is_none_or(|entry| now >= entry.available_at)
            })
            .map(String::as_str)
            .collect()
    }

    /// First model of `chain` that is off cooldown.
    pub fn first_available<'a>(&self, chain: &'a [String]) -> Option<&'a str> {
        self.available(chain).into_iter().next()
    }

    /// Reason for an active cooldown, if any.
    pub fn cooldown_reason(&self, model_id: &str) -> Option<CooldownReason> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states
            .get(model_id)
            .filter(|entry| Instant::now() < entry.available_at)
            .map(|entry| entry.reason)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
