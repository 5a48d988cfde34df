//! Wit.ai entity extraction provider
//!
//! Sends the raw prompt to `/message` and returns the entities Wit.ai
//! recognized, grouped by entity type.

use crate::{
    error::{AppError, AppResult},
    models::{EntityMap, WitResponse},
    services::{call_policy::CallPolicy, providers::EntityExtractor},
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct WitExtractor {
    http_client: HttpClient,
    api_token: String,
    api_url: String,
    api_version: String,
    policy: CallPolicy,
}

impl WitExtractor {
    pub fn new(
        http_client: HttpClient,
        api_token: String,
        api_url: String,
        api_version: String,
        policy: CallPolicy,
    ) -> Self {
        Self {
            http_client,
            api_token,
            api_url,
            api_version,
            policy,
        }
    }

    async fn fetch_message(&self, text: &str) -> AppResult<WitResponse> {
        let url = format!("{}/message", self.api_url.trim_end_matches('/'));

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&[("v", self.api_version.as_str()), ("q", text)])
            .send()
            .await
            .map_err(|e| AppError::Extraction(format!("error in sending request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Extraction(format!(
                "Wit.ai returned status {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Extraction(format!("error in reading: {}", e)))?;
        tracing::debug!(response = %body, "Raw Wit.ai response");

        serde_json::from_str(&body)
            .map_err(|e| AppError::Extraction(format!("error in unmarshalling: {}", e)))
    }
}

#[async_trait::async_trait]
impl EntityExtractor for WitExtractor {
    async fn extract(&self, text: &str) -> AppResult<EntityMap> {
        let response = self
            .policy
            .run("wit.message", move || self.fetch_message(text))
            .await
            .map_err(|failure| failure.into_stage_error(AppError::Extraction))?;

        tracing::info!(
            entity_types = response.entities.len(),
            provider = self.name(),
            "Entities extracted"
        );

        Ok(response.entities)
    }

    fn name(&self) -> &'static str {
        "wit"
    }
}
