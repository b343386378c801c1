//! HTTP clients for the model provider and the external nutrition database.

pub mod embeddings;
pub mod fatsecret;
pub mod llm;
pub mod nutritionix;
