use std::sync::Arc;

use crate::services::RecommendationPipeline;

/// Shared application state. Holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RecommendationPipeline>,
}

impl AppState {
    pub fn new(pipeline: RecommendationPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
