use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, instrument};

use super::dto::{Nutrition, ParsedFoodMention, ReferenceFoodRow, ResolvedFood};
use super::repo::ReferenceStore;
use super::tiers::{ApiFallbackTier, CuratedTableTier, ResolutionTier, SemanticTier};
use crate::clients::embeddings::EmbeddingClient;
use crate::clients::fatsecret::{NutritionFacts, NutritionLookup};
use crate::index::SemanticIndex;
use crate::retry::RetryPolicy;
use crate::units::UnitTable;

pub const SIMILARITY_THRESHOLD: f32 = 0.85;
pub const SEMANTIC_TOP_K: usize = 3;

/// Generic estimate used when the external database has nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceholderEstimate {
    pub quantity: f64,
    pub unit: &'static str,
    pub nutrition: Nutrition,
}

pub const PLACEHOLDER_ESTIMATE: PlaceholderEstimate = PlaceholderEstimate {
    quantity: 1.0,
    unit: "serving",
    nutrition: Nutrition {
        calories: 200.0,
        protein: 10.0,
        fat: 5.0,
        carbs: 25.0,
    },
};

impl Default for PlaceholderEstimate {
    fn default() -> Self {
        PLACEHOLDER_ESTIMATE
    }
}

impl PlaceholderEstimate {
    pub fn facts_for(&self, food_name: &str) -> NutritionFacts {
        NutritionFacts {
            name: food_name.to_string(),
            base_quantity: self.quantity,
            unit: self.unit.to_string(),
            nutrition: self.nutrition,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub similarity_threshold: f32,
    pub top_k: usize,
    pub placeholder: PlaceholderEstimate,
    pub units: UnitTable,
    pub retry: RetryPolicy,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: SIMILARITY_THRESHOLD,
            top_k: SEMANTIC_TOP_K,
            placeholder: PlaceholderEstimate::default(),
            units: UnitTable::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Collaborators the standard ladder is built from.
#[derive(Clone)]
pub struct ResolverDeps {
    pub embedder: Arc<dyn EmbeddingClient>,
    pub index: Arc<dyn SemanticIndex>,
    pub lookup: Arc<dyn NutritionLookup>,
    pub store: Arc<dyn ReferenceStore>,
}

/// Runs an ordered list of tiers; the first one that produces a result
/// wins.
pub struct FoodResolver {
    tiers: Vec<Box<dyn ResolutionTier>>,
}

impl FoodResolver {
    pub fn new(tiers: Vec<Box<dyn ResolutionTier>>) -> Self {
        Self { tiers }
    }

    /// semantic → curated table → external API.
    pub fn standard(deps: &ResolverDeps, curated: Vec<ReferenceFoodRow>, settings: &ResolverSettings) -> Self {
        Self::new(vec![
            Box::new(SemanticTier {
                embedder: deps.embedder.clone(),
                index: deps.index.clone(),
                threshold: settings.similarity_threshold,
                top_k: settings.top_k,
                units: settings.units.clone(),
                retry: settings.retry,
            }),
            Box::new(CuratedTableTier::new(curated)),
            Box::new(ApiFallbackTier {
                lookup: deps.lookup.clone(),
                learned: deps.store.clone(),
                placeholder: settings.placeholder,
                units: settings.units.clone(),
                retry: settings.retry,
            }),
        ])
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// `Ok(None)` when no tier produced data; the caller drops the mention.
    #[instrument(skip(self, mention), fields(food = %mention.name))]
    pub async fn resolve(&self, mention: &ParsedFoodMention) -> anyhow::Result<Option<ResolvedFood>> {
        for tier in &self.tiers {
            let found = tier
                .attempt_resolve(mention)
                .await
                .with_context(|| format!("{} tier", tier.name()))?;
            if let Some(resolved) = found {
                debug!(tier = tier.name(), calories = resolved.calories, "resolved");
                return Ok(Some(resolved));
            }
        }
        Ok(None)
    }
}
