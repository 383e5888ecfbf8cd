// Recommendation retrieval: prompt construction, response parsing and
// validation, load-more pagination and upstream error classification.
// All model calls go through llm_client; nothing here talks HTTP.

pub mod classifier;
pub mod pagination;
pub mod parser;
pub mod prompt_builder;
pub mod prompts;
pub mod validation;
