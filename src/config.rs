use std::time::Duration;

use serde::Deserialize;

use crate::foods::resolver::{ResolverSettings, SIMILARITY_THRESHOLD};
use crate::retry::{RetryPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS};

pub const FATSECRET_TOKEN_URL: &str = "https://oauth.fatsecret.com/connect/token";
pub const FATSECRET_SEARCH_URL: &str = "https://platform.fatsecret.com/rest/foods/search/v1";
pub const NUTRITIONIX_SEARCH_URL: &str = "https://trackapi.nutritionix.com/v2/search/instant";

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FatSecretConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: String,
    pub search_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NutritionixConfig {
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    pub search_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Admin routes are open when unset.
    pub admin_secret: Option<String>,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub fatsecret: FatSecretConfig,
    /// Lookup backend used when FatSecret has no credentials.
    pub nutritionix: NutritionixConfig,
    pub similarity_threshold: f32,
    pub retry: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let llm = LlmConfig {
            base_url: std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            api_key: optional("LLM_API_KEY"),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
        };
        let embedding = EmbeddingConfig {
            base_url: std::env::var("EMBEDDING_BASE_URL").unwrap_or_else(|_| llm.base_url.clone()),
            api_key: optional("EMBEDDING_API_KEY").or_else(|| llm.api_key.clone()),
            model: std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "text-embedding-3-small".into()),
        };
        let fatsecret = FatSecretConfig {
            client_id: optional("FATSECRET_CLIENT_ID"),
            client_secret: optional("FATSECRET_CLIENT_SECRET"),
            token_url: FATSECRET_TOKEN_URL.into(),
            search_url: FATSECRET_SEARCH_URL.into(),
        };
        let nutritionix = NutritionixConfig {
            app_id: optional("NUTRITIONIX_APP_ID"),
            api_key: optional("NUTRITIONIX_API_KEY"),
            search_url: NUTRITIONIX_SEARCH_URL.into(),
        };

        let similarity_threshold = std::env::var("SIMILARITY_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(SIMILARITY_THRESHOLD);
        let retry = RetryPolicy {
            max_attempts: std::env::var("RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            initial_delay: std::env::var("RETRY_INITIAL_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_INITIAL_DELAY),
        };

        Ok(Self {
            database_url,
            admin_secret: optional("ADMIN_SECRET"),
            llm,
            embedding,
            fatsecret,
            nutritionix,
            similarity_threshold,
            retry,
        })
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            similarity_threshold: self.similarity_threshold,
            retry: self.retry,
            ..ResolverSettings::default()
        }
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
