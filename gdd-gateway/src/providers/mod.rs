pub mod anthropic;
pub mod gemini;
pub mod openai_compatible;
pub mod provider;
pub mod query_dump;
pub mod sse;

use std::time::Duration;

pub use provider::{CompletionRequest, Provider, ProviderError, TextStream};

/// HTTP client shared by every provider client.
///
/// Falls back to reqwest defaults if the configured builder is rejected.
pub fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}
