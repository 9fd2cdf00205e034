//! Debug dump of outgoing LLM requests.
//!
//! When `dump_queries = true` in `[logging]`, each request body is written to
//! `./logs/queries/{timestamp}-{provider}-{model}.request.json`. Failures are
//! logged and never block the request.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

const QUERY_DIR: &str = "./logs/queries";

/// Write `value` as the request dump for one provider call.
pub async fn dump_request(provider: &str, model: &str, value: &Value) -> Option<PathBuf> {
    dump_request_in(Path::new(QUERY_DIR), provider, model, value).await
}

pub(crate) async fn dump_request_in(
    dir: &Path,
    provider: &str,
    model: &str,
    value: &Value,
) -> Option<PathBuf> {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!("dump_queries: failed to create {}: {}", dir.display(), e);
        return None;
    }

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
    let path = dir.join(format!(
        "{}-{}-{}.request.json",
        timestamp,
        provider,
        sanitize_model(model)
    ));

    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            warn!("dump_queries: failed to serialize: {}", e);
            return None;
        }
    };
    if let Err(e) = tokio::fs::write(&path, json).await {
        warn!("dump_queries: failed to write {}: {}", path.display(), e);
        return None;
    }

    debug!("dump_queries: wrote {}", path.display());
    Some(path)
}

fn sanitize_model(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
