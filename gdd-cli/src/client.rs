//! HTTP client for the gdd-gateway API.

use futures::StreamExt;
use gdd_core::{
    AllSectionsContent, EnhanceRequest, ErrorBody, GenerateRequest, HealthResponse, ModelOption,
    SaveSectionRequest, SaveSectionResponse, SectionPayload,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::session::{ChunkStream, SessionBackend};

/// Gateway client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Gateway URL cannot have paths appended: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The section changed on the server since it was loaded
    #[error("{0}")]
    Conflict(String),

    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl ClientError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => code.as_deref(),
            ClientError::Conflict(_) => Some("CONFLICT"),
            _ => None,
        }
    }
}

/// Talks to a running gateway
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base: Url,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        info!("Using gateway at {}", base);
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.endpoint(&["health"])?).send().await?;
        read_json(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    async fn post_stream<B: serde::Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<ChunkStream, ClientError> {
        let url = self.endpoint(segments)?;
        debug!("POST {} (streaming)", url);
        let response = check_status(self.http.post(url).json(body).send().await?).await?;
        Ok(utf8_chunks(response.bytes_stream()))
    }
}

#[async_trait::async_trait]
impl SessionBackend for GatewayClient {
    async fn load_section(&self, game_id: &str, slug: &str) -> Result<SectionPayload, ClientError> {
        self.get_json(&["games", game_id, "sections", slug]).await
    }

    async fn load_all_sections(&self, game_id: &str) -> Result<AllSectionsContent, ClientError> {
        self.get_json(&["games", game_id, "sections"]).await
    }

    async fn list_models(&self) -> Result<Vec<ModelOption>, ClientError> {
        self.get_json(&["ai", "models"]).await
    }

    async fn save_section(
        &self,
        game_id: &str,
        slug: &str,
        request: &SaveSectionRequest,
    ) -> Result<SaveSectionResponse, ClientError> {
        let url = self.endpoint(&["games", game_id, "sections", slug])?;
        let response = self.http.put(url).json(request).send().await?;
        read_json(response).await
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ChunkStream, ClientError> {
        self.post_stream(&["ai", "generate"], request).await
    }

    async fn enhance(&self, request: &EnhanceRequest) -> Result<ChunkStream, ClientError> {
        self.post_stream(&["ai", "enhance"], request).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).ok();
    let message = body
        .as_ref()
        .map(|b| b.error.clone())
        .unwrap_or_else(|| text.trim().to_string());

    if status == StatusCode::CONFLICT {
        return Err(ClientError::Conflict(message));
    }
    Err(ClientError::Api {
        status: status.as_u16(),
        code: body.and_then(|b| b.code),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    Ok(response.json::<T>().await?)
}

/// Re-chunk a byte stream into valid UTF-8 strings.
///
/// A multi-byte character split across network chunks is held back until
/// its remaining bytes arrive.
pub fn utf8_chunks<S, B>(bytes: S) -> ChunkStream
where
    S: futures::Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    pending.extend_from_slice(chunk.as_ref());
                    let text = take_valid_prefix(&mut pending);
                    if !text.is_empty() {
                        yield Ok::<String, ClientError>(text);
                    }
                }
                Err(e) => {
                    yield Err(ClientError::Http(e));
                    break;
                }
            }
        }

        if !pending.is_empty() {
            yield Ok(String::from_utf8_lossy(&pending).into_owned());
        }
    })
}

fn take_valid_prefix(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        // Incomplete trailing sequence: keep it for the next chunk.
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            return text;
        }
    };
    let rest = pending.split_off(valid);
    String::from_utf8(std::mem::replace(pending, rest)).unwrap_or_default()
}
