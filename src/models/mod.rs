use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inbound request body for the recommendation route
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Envelope returned to the caller on success
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub original_prompt: String,
    pub optimized_prompt: String,
    /// Validated model output, passed through untouched
    pub recommendations: serde_json::Value,
}

impl ApiResponse {
    pub fn success(
        original_prompt: String,
        optimized_prompt: String,
        recommendations: serde_json::Value,
    ) -> Self {
        Self {
            status: "success".to_string(),
            original_prompt,
            optimized_prompt,
            recommendations,
        }
    }
}

/// One similarity-search result, built from the index's stored metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateMovie {
    pub id: String,
    pub title: String,
    pub overview: String,
    pub genres: String,
    pub release_date: String,
    /// Similarity in 0.0..=1.0, higher is closer
    pub score: f64,
}

/// Projection of a candidate embedded in the synthesis prompt. The id is left out.
#[derive(Debug, Serialize)]
pub struct CandidateSummary<'a> {
    pub title: &'a str,
    pub overview: &'a str,
    pub genres: &'a str,
    pub release_date: &'a str,
    pub score: f64,
}

impl<'a> From<&'a CandidateMovie> for CandidateSummary<'a> {
    fn from(movie: &'a CandidateMovie) -> Self {
        Self {
            title: &movie.title,
            overview: &movie.overview,
            genres: &movie.genres,
            release_date: &movie.release_date,
            score: movie.score,
        }
    }
}

/// Enriched record produced by the generative model.
///
/// Every field except `alternative_suggestions` must be present for the
/// model output to be accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub overview: String,
    pub cast: Vec<String>,
    pub directors: Vec<String>,
    pub producers: Vec<String>,
    pub language: String,
    pub release_date: String,
    pub poster_url: String,
    pub relevance_explanation: String,
    pub keywords: Vec<String>,
    pub relevance_score: f64,
    pub is_relevant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_suggestions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
}

// ============================================================================
// Wit.ai Types
// ============================================================================

/// Response from GET /message
#[derive(Debug, Clone, Deserialize)]
pub struct WitResponse {
    #[serde(default)]
    pub entities: EntityMap,
    #[serde(default)]
    pub text: String,
}

/// A named text span extracted from the raw prompt
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExtractedEntity {
    pub body: String,
}

/// Entity type name → entities of that type, in service order
pub type EntityMap = BTreeMap<String, Vec<ExtractedEntity>>;

// ============================================================================
// Pinecone Types
// ============================================================================

/// Control-plane response from GET /indexes/{name}
#[derive(Debug, Clone, Deserialize)]
pub struct PineconeIndexDescription {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub dimension: Option<u32>,
}

/// Body for POST /query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PineconeQueryRequest {
    pub vector: Vec<f32>,
    pub top_k: u32,
    pub include_values: bool,
    pub include_metadata: bool,
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PineconeQueryResponse {
    #[serde(default)]
    pub matches: Vec<PineconeMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PineconeMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: MovieMetadata,
}

/// Metadata stored alongside each movie vector
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovieMetadata {
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub genres: String,
    pub release_date: String,
    pub spoken_languages: String,
    pub tagline: String,
}

impl From<PineconeMatch> for CandidateMovie {
    fn from(m: PineconeMatch) -> Self {
        CandidateMovie {
            id: m.id,
            title: m.metadata.title,
            overview: m.metadata.overview,
            genres: m.metadata.genres,
            release_date: m.metadata.release_date,
            score: f64::from(m.score),
        }
    }
}

// ============================================================================
// Chat Completion Types
// ============================================================================

/// Body for POST /chat/completions
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

/// Top-level completion envelope. Fields are optional so that each missing
/// piece can be reported on its own.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionEnvelope {
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub choices: Option<Vec<CompletionChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<CompletionMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}
