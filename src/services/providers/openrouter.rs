//! OpenRouter chat-completion provider

use crate::{
    error::{AppError, AppResult, EnvelopeError},
    models::ChatCompletionRequest,
    services::{call_policy::CallPolicy, providers::CompletionProvider, synthesis::unwrap_envelope},
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct OpenRouterClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    referer: String,
    title: String,
    policy: CallPolicy,
}

impl OpenRouterClient {
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        referer: String,
        title: String,
        policy: CallPolicy,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            referer,
            title,
            policy,
        }
    }

    async fn post_once(&self, request: &ChatCompletionRequest) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Synthesis(format!("failed to make request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Synthesis(format!("failed to read response: {}", e)))?;

        tracing::debug!(response = %body, "Raw completion response");

        if !status.is_success() {
            tracing::warn!(status = %status, "Completion endpoint returned non-success status");
            if let Err(err @ EnvelopeError::ProviderError { .. }) = unwrap_envelope(&body) {
                return Err(err.into());
            }
            return Err(AppError::Synthesis(format!(
                "OpenRouter returned status {}: {}",
                status, body
            )));
        }

        Ok(body)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn complete(&self, request: &ChatCompletionRequest) -> AppResult<String> {
        tracing::info!(
            model = %request.model,
            max_tokens = request.max_tokens,
            provider = self.name(),
            "Sending completion request"
        );

        self.policy
            .run("openrouter.chat", move || self.post_once(request))
            .await
            .map_err(|failure| failure.into_stage_error(AppError::Synthesis))
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, ResponseFormat};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(server: &MockServer, policy: CallPolicy) -> OpenRouterClient {
        OpenRouterClient::new(
            HttpClient::new(),
            "test-key".to_string(),
            server.uri(),
            "https://localhost:8080".to_string(),
            "Movie Recommendations".to_string(),
            policy,
        )
    }

    fn sample_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "recommend something".to_string(),
            }],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
            temperature: 0.7,
            max_tokens: 4000,
        }
    }

    #[tokio::test]
    async fn test_complete_posts_request_with_attribution_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("http-referer", "https://localhost:8080"))
            .and(header("x-title", "Movie Recommendations"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "response_format": {"type": "json_object"},
                "max_tokens": 4000,
                "messages": [{"role": "user", "content": "recommend something"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"choices": []}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_test_client(&server, CallPolicy::default());
        let body = client.complete(&sample_request()).await.unwrap();
        assert_eq!(body, r#"{"choices": []}"#);
    }

    #[tokio::test]
    async fn test_complete_reports_provider_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"error": {"message": "rate limited", "code": 429}})),
            )
            .mount(&server)
            .await;

        let client = create_test_client(&server, CallPolicy::default());
        let err = client.complete(&sample_request()).await.unwrap_err();
        assert!(
            matches!(err, AppError::Synthesis(ref msg) if msg.starts_with("API error") && msg.contains("rate limited"))
        );
    }

    #[tokio::test]
    async fn test_complete_rejects_non_success_status_with_valid_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(502).set_body_string(
                r#"{"choices":[{"message":{"content":"{\"recommendations\":[]}"}}]}"#,
            ))
            .mount(&server)
            .await;

        let client = create_test_client(&server, CallPolicy::default());
        let err = client.complete(&sample_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Synthesis(ref msg) if msg.contains("502")));
    }

    #[tokio::test]
    async fn test_complete_keeps_status_when_body_has_no_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string(r#"{"detail":"overloaded"}"#))
            .mount(&server)
            .await;

        let client = create_test_client(&server, CallPolicy::default());
        let err = client.complete(&sample_request()).await.unwrap_err();
        assert!(
            matches!(err, AppError::Synthesis(ref msg) if msg.contains("503") && msg.contains("overloaded"))
        );
    }

    #[tokio::test]
    async fn test_complete_honours_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = create_test_client(&server, CallPolicy::with_timeout(Duration::from_millis(50)));
        let err = client.complete(&sample_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Synthesis(ref msg) if msg.contains("timed out")));
    }
}
