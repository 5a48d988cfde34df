//! External service abstraction
//!
//! Each stage of the recommendation pipeline talks to one third-party service
//! through a trait defined here, so the pipeline can be driven by mocks in tests
//! and providers can be swapped without touching orchestration.

use crate::{
    error::AppResult,
    models::{CandidateMovie, ChatCompletionRequest, EntityMap},
};

pub mod embed_process;
pub mod openrouter;
pub mod pinecone;
pub mod wit;

pub use embed_process::ProcessEmbedder;
pub use openrouter::OpenRouterClient;
pub use pinecone::PineconeIndex;
pub use wit::WitExtractor;

/// Natural-language understanding service that finds entities in free text
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Extract entities grouped by entity type
    ///
    /// An input with no recognizable entities yields an empty map, not an error.
    async fn extract(&self, text: &str) -> AppResult<EntityMap>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Turns text into a fixed-length embedding vector
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f64>>;

    fn name(&self) -> &'static str;
}

/// Similarity-search index holding movie vectors and their metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` nearest movies ordered by descending score
    async fn query(&self, vector: &[f64], top_k: u32) -> AppResult<Vec<CandidateMovie>>;

    fn name(&self) -> &'static str;
}

/// Generative chat-completion endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send the request and return the raw response body.
    ///
    /// The body is returned even for non-success statuses so that error
    /// envelopes can be reported by the caller.
    async fn complete(&self, request: &ChatCompletionRequest) -> AppResult<String>;

    fn name(&self) -> &'static str;
}
