use crate::{error::AppResult, models::EntityMap, services::providers::EntityExtractor};

/// Space-join every entity body, type by type.
///
/// Order across entity types follows the map; callers should rely on the set
/// of tokens, not their sequence.
pub fn join_entity_bodies(entities: &EntityMap) -> String {
    entities
        .values()
        .flatten()
        .map(|entity| entity.body.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derives the optimized query used for semantic search from the raw prompt.
///
/// Zero entities produce an empty string, which is still a valid query.
pub async fn optimize_prompt(extractor: &dyn EntityExtractor, prompt: &str) -> AppResult<String> {
    let entities = extractor.extract(prompt).await?;
    Ok(join_entity_bodies(&entities))
}
