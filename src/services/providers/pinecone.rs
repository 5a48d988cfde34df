//! Pinecone vector index provider
//!
//! API Flow:
//! 1. Startup: GET {control}/indexes/{name} → confirms the index exists and reports its host
//! 2. Query: POST {host}/query → nearest vectors with stored movie metadata
//!
//! Vectors are narrowed from f64 to f32 before submission since the index
//! stores single-precision values. The narrowing is lossy and affects which
//! neighbours come back for borderline scores.

use crate::{
    error::{AppError, AppResult},
    models::{
        CandidateMovie, PineconeIndexDescription, PineconeQueryRequest, PineconeQueryResponse,
    },
    services::{call_policy::CallPolicy, providers::VectorIndex},
};
use reqwest::{Client as HttpClient, StatusCode};

const API_KEY_HEADER: &str = "Api-Key";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const API_VERSION: &str = "2024-07";

#[derive(Clone)]
pub struct PineconeIndex {
    http_client: HttpClient,
    api_key: String,
    index_name: String,
    host: String,
    namespace: String,
    policy: CallPolicy,
}

impl PineconeIndex {
    /// Creates a client for an index whose host is already known
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        index_name: String,
        host: String,
        namespace: String,
        policy: CallPolicy,
    ) -> Self {
        Self {
            http_client,
            api_key,
            index_name,
            host: normalize_host(&host),
            namespace,
            policy,
        }
    }

    /// Describes the index on the control plane and builds a client for it.
    ///
    /// A missing index is a configuration error and is not retried.
    /// `host_override` wins over the host reported by the control plane.
    pub async fn connect(
        http_client: HttpClient,
        api_key: String,
        control_url: &str,
        index_name: String,
        host_override: Option<String>,
        namespace: String,
        policy: CallPolicy,
    ) -> AppResult<Self> {
        let description =
            Self::describe_index(&http_client, &api_key, control_url, &index_name).await?;

        tracing::info!(
            index = %description.name,
            host = %description.host,
            dimension = ?description.dimension,
            "Vector index described"
        );

        let host = host_override.unwrap_or(description.host);
        Ok(Self::new(
            http_client,
            api_key,
            index_name,
            host,
            namespace,
            policy,
        ))
    }

    async fn describe_index(
        http_client: &HttpClient,
        api_key: &str,
        control_url: &str,
        index_name: &str,
    ) -> AppResult<PineconeIndexDescription> {
        let url = format!("{}/indexes/{}", control_url.trim_end_matches('/'), index_name);

        let response = http_client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()
            .await
            .map_err(|e| AppError::Search(format!("failed to describe index: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::Search(format!(
                "index '{}' does not exist",
                index_name
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "failed to describe index: status {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("failed to describe index: {}", e)))
    }

    async fn query_once(&self, request: &PineconeQueryRequest) -> AppResult<PineconeQueryResponse> {
        let url = format!("{}/query", self.host);

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Search(format!("failed to query index: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Pinecone returned status {}: {}",
                status, body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| AppError::Search(format!("failed to read response: {}", e)))?;
        tracing::debug!(response = %response_text, "Raw Pinecone response");

        serde_json::from_str(&response_text)
            .map_err(|e| AppError::Search(format!("failed to parse Pinecone response: {}", e)))
    }
}

/// Hosts reported by the control plane carry no scheme
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Narrow an f64 embedding to the index's f32 representation
pub fn narrow_vector(vector: &[f64]) -> Vec<f32> {
    vector.iter().map(|&v| v as f32).collect()
}

#[async_trait::async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f64], top_k: u32) -> AppResult<Vec<CandidateMovie>> {
        let request = PineconeQueryRequest {
            vector: narrow_vector(vector),
            top_k,
            include_values: false,
            include_metadata: true,
            namespace: self.namespace.clone(),
        };

        let request = &request;
        let response = self
            .policy
            .run("pinecone.query", move || self.query_once(request))
            .await
            .map_err(|failure| failure.into_stage_error(AppError::Search))?;

        if response.matches.is_empty() {
            return Err(AppError::NoMatches);
        }

        let mut candidates: Vec<CandidateMovie> =
            response.matches.into_iter().map(CandidateMovie::from).collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::info!(
            index = %self.index_name,
            matches = candidates.len(),
            provider = self.name(),
            "Vector search completed"
        );

        Ok(candidates)
    }

    fn name(&self) -> &'static str {
        "pinecone"
    }
}
