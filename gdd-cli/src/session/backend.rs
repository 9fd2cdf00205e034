//! What an editing session needs from the outside world.

use std::pin::Pin;

use futures::Stream;
use gdd_core::{
    AllSectionsContent, EnhanceRequest, GenerateRequest, ModelOption, SaveSectionRequest,
    SaveSectionResponse, SectionPayload,
};

use crate::client::ClientError;

/// Text chunks of a streamed AI response. Dropping it closes the connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

#[async_trait::async_trait]
pub trait SessionBackend: Send + Sync {
    async fn load_section(&self, game_id: &str, slug: &str) -> Result<SectionPayload, ClientError>;

    async fn load_all_sections(&self, game_id: &str) -> Result<AllSectionsContent, ClientError>;

    async fn list_models(&self) -> Result<Vec<ModelOption>, ClientError>;

    async fn save_section(
        &self,
        game_id: &str,
        slug: &str,
        request: &SaveSectionRequest,
    ) -> Result<SaveSectionResponse, ClientError>;

    async fn generate(&self, request: &GenerateRequest) -> Result<ChunkStream, ClientError>;

    async fn enhance(&self, request: &EnhanceRequest) -> Result<ChunkStream, ClientError>;
}
