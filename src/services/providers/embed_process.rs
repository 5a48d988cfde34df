//! Embedding provider backed by an external executable
//!
//! The executable receives the text as its last argument and must print a JSON
//! array of floats on stdout. A non-zero exit, empty output or malformed JSON
//! is a hard failure.

use crate::{
    error::{AppError, AppResult},
    services::{call_policy::CallPolicy, providers::Embedder},
};
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct ProcessEmbedder {
    command: String,
    args: Vec<String>,
    policy: CallPolicy,
}

impl ProcessEmbedder {
    pub fn new(command: String, args: Vec<String>, policy: CallPolicy) -> Self {
        Self {
            command,
            args,
            policy,
        }
    }

    async fn run_once(&self, text: &str) -> AppResult<Vec<f64>> {
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::Embedding(format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Embedding(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        parse_embedding(&output.stdout)
    }
}

/// Parse the executable's stdout into a vector
fn parse_embedding(stdout: &[u8]) -> AppResult<Vec<f64>> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Embedding("embedder produced no output".to_string()));
    }

    serde_json::from_str(text)
        .map_err(|e| AppError::Embedding(format!("invalid embedding output: {}", e)))
}

#[async_trait::async_trait]
impl Embedder for ProcessEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f64>> {
        let embedding = self
            .policy
            .run("embed.process", move || self.run_once(text))
            .await
            .map_err(|failure| failure.into_stage_error(AppError::Embedding))?;

        tracing::info!(
            dimensions = embedding.len(),
            provider = self.name(),
            "Embedding generated"
        );

        Ok(embedding)
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
