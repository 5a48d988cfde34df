use std::fmt;
use std::sync::Arc;

use reqwest::Client as HttpClient;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::ApiResponse,
    services::{
        entities::optimize_prompt,
        providers::{
            Embedder, EntityExtractor, OpenRouterClient, PineconeIndex, ProcessEmbedder,
            VectorIndex, WitExtractor,
        },
        synthesis::Synthesizer,
    },
};

/// Number of nearest movies requested from the index
pub const TOP_K: u32 = 10;

/// Progress of a single request through the pipeline. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Optimized,
    Embedded,
    Searched,
    Synthesized,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Optimized => "optimized",
            Stage::Embedded => "embedded",
            Stage::Searched => "searched",
            Stage::Synthesized => "synthesized",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Rejects missing or blank prompts before any external call is made
pub fn validate_prompt(prompt: &str) -> AppResult<&str> {
    if prompt.trim().is_empty() {
        return Err(AppError::Validation("Prompt cannot be empty".to_string()));
    }
    Ok(prompt)
}

/// Extract → embed → search → synthesize, strictly in order
#[derive(Clone)]
pub struct RecommendationPipeline {
    extractor: Arc<dyn EntityExtractor>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    synthesizer: Synthesizer,
}

impl RecommendationPipeline {
    pub fn new(
        extractor: Arc<dyn EntityExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        synthesizer: Synthesizer,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            synthesizer,
        }
    }

    /// Wires the production providers from configuration.
    ///
    /// Fails if the configured vector index does not exist.
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::new();
        let provider_policy = config.provider_policy();

        let extractor = WitExtractor::new(
            http_client.clone(),
            config.wit_api_token.clone(),
            config.wit_api_url.clone(),
            config.wit_api_version.clone(),
            provider_policy,
        );

        let embedder = ProcessEmbedder::new(
            config.embed_command.clone(),
            config.embed_args.clone(),
            provider_policy,
        );

        let index = PineconeIndex::connect(
            http_client.clone(),
            config.pinecone_api_key.clone(),
            &config.pinecone_control_url,
            config.pinecone_index_name.clone(),
            config.pinecone_index_host.clone(),
            config.pinecone_namespace.clone(),
            provider_policy,
        )
        .await?;

        let completion = OpenRouterClient::new(
            http_client,
            config.openrouter_api_key.clone(),
            config.openrouter_api_url.clone(),
            config.completion_referer.clone(),
            config.completion_title.clone(),
            config.completion_policy(),
        );

        Ok(Self::new(
            Arc::new(extractor),
            Arc::new(embedder),
            Arc::new(index),
            Synthesizer::new(Arc::new(completion), config.completion_model.clone()),
        ))
    }

    /// Runs every stage for one prompt. The first failing stage aborts the run.
    pub async fn run(&self, prompt: &str) -> AppResult<ApiResponse> {
        let prompt = validate_prompt(prompt)?;
        let mut stage = Stage::Received;

        let result = self.run_stages(prompt, &mut stage).await;
        match &result {
            Ok(_) => tracing::info!(stage = %stage, "Request complete"),
            Err(e) => tracing::error!(
                stage = %stage,
                failed = e.stage(),
                error = %e,
                "Pipeline aborted"
            ),
        }
        result
    }

    async fn run_stages(&self, prompt: &str, stage: &mut Stage) -> AppResult<ApiResponse> {
        tracing::info!(prompt = %prompt, "Optimizing prompt");
        let optimized = optimize_prompt(self.extractor.as_ref(), prompt).await?;
        *stage = Stage::Optimized;
        tracing::info!(optimized_prompt = %optimized, "Prompt optimized");

        let embedding = self.embedder.embed(&optimized).await?;
        *stage = Stage::Embedded;
        tracing::info!(dimensions = embedding.len(), "Embedding generated");

        let candidates = self.index.query(&embedding, TOP_K).await?;
        if candidates.is_empty() {
            return Err(AppError::NoMatches);
        }
        *stage = Stage::Searched;
        tracing::info!(matches = candidates.len(), "Candidates retrieved");

        let recommendations = self.synthesizer.synthesize(prompt, &candidates).await?;
        *stage = Stage::Synthesized;

        let response = ApiResponse::success(prompt.to_string(), optimized, recommendations);
        *stage = Stage::Responded;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateMovie, ExtractedEntity};
    use crate::services::providers::{
        MockCompletionProvider, MockEmbedder, MockEntityExtractor, MockVectorIndex,
    };
    use serde_json::json;

    fn recommendation_content() -> String {
        json!({
            "recommendations": [{
                "title": "Galaxy Quest",
                "overview": "Actors become real space heroes",
                "cast": ["Tim Allen"],
                "directors": ["Dean Parisot"],
                "producers": ["Mark Johnson"],
                "language": "English",
                "release_date": "1999-12-23",
                "poster_url": "https://example.com/galaxy-quest.jpg",
                "relevance_explanation": "Funny space adventure",
                "keywords": ["space", "comedy"],
                "relevance_score": 0.95,
                "is_relevant": true
            }]
        })
        .to_string()
    }

    fn galaxy_quest() -> CandidateMovie {
        CandidateMovie {
            id: "movie-926".to_string(),
            title: "Galaxy Quest".to_string(),
            overview: "Actors in space".to_string(),
            genres: "Comedy".to_string(),
            release_date: "1999-12-23".to_string(),
            score: 0.92,
        }
    }

    struct Mocks {
        extractor: MockEntityExtractor,
        embedder: MockEmbedder,
        index: MockVectorIndex,
        completion: MockCompletionProvider,
    }

    impl Mocks {
        fn new() -> Self {
            let mut completion = MockCompletionProvider::new();
            completion.expect_name().return_const("mock");
            Self {
                extractor: MockEntityExtractor::new(),
                embedder: MockEmbedder::new(),
                index: MockVectorIndex::new(),
                completion,
            }
        }

        fn into_pipeline(self) -> RecommendationPipeline {
            RecommendationPipeline::new(
                Arc::new(self.extractor),
                Arc::new(self.embedder),
                Arc::new(self.index),
                Synthesizer::new(Arc::new(self.completion), "test-model".to_string()),
            )
        }
    }

    #[test]
    fn test_validate_prompt() {
        assert!(validate_prompt("space movie").is_ok());
        assert!(matches!(validate_prompt(""), Err(AppError::Validation(_))));
        assert!(matches!(validate_prompt("   "), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_prompt_makes_no_external_calls() {
        let mut mocks = Mocks::new();
        mocks.extractor.expect_extract().never();
        mocks.embedder.expect_embed().never();
        mocks.index.expect_query().never();
        mocks.completion.expect_complete().never();

        let result = mocks.into_pipeline().run("").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_zero_entities_continue_with_empty_query() {
        let mut mocks = Mocks::new();
        mocks
            .extractor
            .expect_extract()
            .returning(|_| Ok(Default::default()));
        mocks
            .embedder
            .expect_embed()
            .withf(|text: &str| text.is_empty())
            .times(1)
            .returning(|_| Ok(vec![0.1, 0.2, 0.3]));
        mocks
            .index
            .expect_query()
            .returning(|_, _| Ok(vec![galaxy_quest()]));
        let body = json!({"choices": [{"message": {"content": recommendation_content()}}]})
            .to_string();
        mocks
            .completion
            .expect_complete()
            .returning(move |_| Ok(body.clone()));

        let response = mocks.into_pipeline().run("hmm").await.unwrap();
        assert_eq!(response.optimized_prompt, "");
        assert_eq!(response.status, "success");
    }

    #[tokio::test]
    async fn test_no_matches_stops_before_synthesis() {
        let mut mocks = Mocks::new();
        mocks.extractor.expect_extract().returning(|_| {
            let mut map = crate::models::EntityMap::new();
            map.insert(
                "topic".to_string(),
                vec![ExtractedEntity {
                    body: "space".to_string(),
                }],
            );
            Ok(map)
        });
        mocks.embedder.expect_embed().returning(|_| Ok(vec![0.1]));
        mocks
            .index
            .expect_query()
            .withf(|_: &[f64], top_k: &u32| *top_k == TOP_K)
            .returning(|_, _| Ok(vec![]));
        mocks.completion.expect_complete().never();

        let result = mocks.into_pipeline().run("space").await;
        assert!(matches!(result, Err(AppError::NoMatches)));
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_pipeline() {
        let mut mocks = Mocks::new();
        mocks
            .extractor
            .expect_extract()
            .returning(|_| Ok(Default::default()));
        mocks
            .embedder
            .expect_embed()
            .returning(|_| Err(AppError::Embedding("exit status: 1".to_string())));
        mocks.index.expect_query().never();
        mocks.completion.expect_complete().never();

        let err = mocks.into_pipeline().run("space").await.unwrap_err();
        assert_eq!(err.to_string(), "Embedding generation failed: exit status: 1");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Searched.to_string(), "searched");
    }
}
