use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult, EnvelopeError},
    models::{
        CandidateMovie, CandidateSummary, ChatCompletionRequest, ChatMessage, CompletionEnvelope,
        RecommendationSet, ResponseFormat,
    },
    services::providers::CompletionProvider,
};

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 4000;

const INSTRUCTIONS: &str = r#"You are a movie recommendation system. Analyze these movies based on the user query.
Your response must be a valid JSON object with the exact structure shown below.
For each movie:
1. Research and provide complete movie details including cast, directors, producers, language, and a link to the movie poster
2. Determine if it's relevant to the user's query
3. Provide a clear, very concise explanation of relevance or lack thereof
4. Assign a relevance score from 0.0 to 1.0
5. Extract 3-5 key matching keywords
6. For non-relevant movies, suggest 2-3 alternative movies from similar genres

Your response MUST be in this exact JSON format:
{
    "recommendations": [
        {
            "title": "Movie Title",
            "overview": "Detailed plot summary",
            "cast": ["Actor 1", "Actor 2", "Actor 3"],
            "directors": ["Director 1", "Director 2"],
            "producers": ["Producer 1", "Producer 2"],
            "language": "Original language",
            "release_date": "YYYY-MM-DD",
            "poster_url": "https://example.com/movie-poster.jpg",
            "relevance_explanation": "Clear explanation of why the movie matches or doesn't match the query",
            "keywords": ["keyword1", "keyword2", "keyword3"],
            "relevance_score": 0.95,
            "is_relevant": true,
            "alternative_suggestions": ["Movie 1", "Movie 2"]
        }
    ]
}

Based on the provided movie title and overview, research and include accurate cast, directors, producers, language, and poster URL information. Do not include any text before or after the JSON object. Ensure the response is valid JSON. Keep every field as short as possible."#;

/// Payload serialized into the single user message
#[derive(Debug, Serialize)]
struct SynthesisPrompt<'a> {
    user_query: &'a str,
    movies: Vec<CandidateSummary<'a>>,
    instructions: &'static str,
}

/// Builds the prompt text sent to the model
pub fn build_prompt(query: &str, candidates: &[CandidateMovie]) -> AppResult<String> {
    let prompt = SynthesisPrompt {
        user_query: query,
        movies: candidates.iter().map(CandidateSummary::from).collect(),
        instructions: INSTRUCTIONS,
    };

    serde_json::to_string(&prompt)
        .map_err(|e| AppError::Synthesis(format!("failed to create prompt: {}", e)))
}

pub fn build_request(model: &str, prompt: String) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt,
        }],
        response_format: ResponseFormat {
            format_type: "json_object".to_string(),
        },
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Pulls `choices[0].message.content` out of a raw completion body
pub fn unwrap_envelope(body: &str) -> Result<String, EnvelopeError> {
    let envelope: CompletionEnvelope =
        serde_json::from_str(body).map_err(|e| EnvelopeError::Undecodable {
            reason: e.to_string(),
            body: body.to_string(),
        })?;

    if let Some(error) = envelope.error.filter(|e| !e.is_null()) {
        return Err(EnvelopeError::ProviderError {
            error: error.to_string(),
            body: body.to_string(),
        });
    }

    let choices = envelope.choices.ok_or_else(|| EnvelopeError::MissingChoices {
        body: body.to_string(),
    })?;

    let first = choices
        .into_iter()
        .next()
        .ok_or_else(|| EnvelopeError::EmptyChoices {
            body: body.to_string(),
        })?;

    let message = first.message.ok_or_else(|| EnvelopeError::MissingMessage {
        body: body.to_string(),
    })?;

    match message.content {
        Some(serde_json::Value::String(content)) => Ok(content),
        _ => Err(EnvelopeError::NonStringContent {
            body: body.to_string(),
        }),
    }
}

/// Removes a Markdown code fence (with optional language tag) around model output
pub fn strip_fences(content: &str) -> &str {
    let content = content.trim();
    let content = content
        .strip_prefix("```json")
        .or_else(|| content.strip_prefix("```"))
        .unwrap_or(content);
    let content = content.strip_suffix("```").unwrap_or(content);
    content.trim()
}

/// Two-stage validation: well-formed JSON first, then the full recommendation schema.
///
/// The validated document is returned as-is so the caller sees exactly what the
/// model produced.
pub fn validate_recommendations(content: &str) -> AppResult<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| AppError::Synthesis(format!("AI response is not valid JSON: {}", e)))?;

    RecommendationSet::deserialize(&value).map_err(|e| {
        AppError::Synthesis(format!("invalid JSON structure in AI response: {}", e))
    })?;

    Ok(value)
}

/// Turns search candidates into enriched recommendations via a generative model
/// Number of entries in a validated recommendation payload
pub fn recommendation_count(recommendations: &serde_json::Value) -> usize {
    recommendations["recommendations"]
        .as_array()
        .map_or(0, Vec::len)
}

#[derive(Clone)]
pub struct Synthesizer {
    provider: Arc<dyn CompletionProvider>,
    model: String,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: String) -> Self {
        Self { provider, model }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        candidates: &[CandidateMovie],
    ) -> AppResult<serde_json::Value> {
        if candidates.is_empty() {
            return Err(AppError::NoMatches);
        }

        let prompt = build_prompt(query, candidates)?;
        let request = build_request(&self.model, prompt);

        let body = self.provider.complete(&request).await?;
        let content = unwrap_envelope(&body).map_err(|e| {
            tracing::error!(error = %e, "Completion envelope rejected");
            AppError::from(e)
        })?;

        let recommendations = validate_recommendations(strip_fences(&content))?;

        tracing::info!(
            candidates = candidates.len(),
            recommendations = recommendation_count(&recommendations),
            provider = self.provider.name(),
            "Recommendations synthesized"
        );

        Ok(recommendations)
    }
}
