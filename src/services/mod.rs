pub mod call_policy;
pub mod entities;
pub mod pipeline;
pub mod providers;
pub mod synthesis;

pub use pipeline::RecommendationPipeline;
