//! Prompt text sent with every enrichment request

/// System message: task description and the exact output schema.
pub const SYSTEM_PROMPT: &str = r#"You read short news posts followed by commodity traders and managers and turn each one into structured data for a knowledge graph of entities that influence each other and commodity prices.

For the given post, produce:
- type_of_content: one of
    macro      global economy, monetary policy, GDP, inflation, geopolitics
    industry   updates about one industry such as energy, steel or agriculture
    commodity  price, supply or demand of a specific commodity
    news       breaking news or short-term events
- entities: an object mapping an entity type (Commodity, Country, Company, Port, Price, ...) to the list of distinct entity names of that type found in the post. Use standard names ("Iron Ore", not "ore"). Leave out types with no entities and never use a type called "other". Use {} when there are none.
- hashtags: hashtags that literally appear in the post, or [].
- subject: about four words describing the main focus, preferring commodity themes ("Steel Prices", "Iron Ore Supply").

Only report what the post states. Always answer in English.

Reply with a single JSON object and nothing else:
{"type_of_content": "macro|industry|commodity|news", "entities": {"EntityType": ["Name", ...]}, "hashtags": ["..."], "subject": "..."}"#;

/// User message for one post.
pub fn user_message(text: &str) -> String {
    format!("Input News Text: {text}")
}
