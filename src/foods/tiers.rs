use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, info_span, warn, Instrument};

use super::dto::{normalize_name, FoodSource, ParsedFoodMention, ReferenceFoodRow, ResolvedFood};
use super::repo::ReferenceStore;
use super::resolver::PlaceholderEstimate;
use crate::clients::embeddings::EmbeddingClient;
use crate::clients::fatsecret::{NutritionFacts, NutritionLookup};
use crate::index::SemanticIndex;
use crate::retry::{with_retry, RetryPolicy};
use crate::units::UnitTable;

/// One rung of the resolution ladder. `Ok(None)` passes the mention on
/// to the next tier; `Err` is a dependency failure after retries.
#[async_trait]
pub trait ResolutionTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt_resolve(&self, mention: &ParsedFoodMention) -> anyhow::Result<Option<ResolvedFood>>;
}

/// Nearest neighbour in the semantic index, accepted above a similarity
/// threshold.
pub struct SemanticTier {
    pub embedder: Arc<dyn EmbeddingClient>,
    pub index: Arc<dyn SemanticIndex>,
    pub threshold: f32,
    pub top_k: usize,
    pub units: UnitTable,
    pub retry: RetryPolicy,
}

#[async_trait]
impl ResolutionTier for SemanticTier {
    fn name(&self) -> &'static str {
        "semantic"
    }

    async fn attempt_resolve(&self, mention: &ParsedFoodMention) -> anyhow::Result<Option<ResolvedFood>> {
        let embedder = &self.embedder;
        let name = mention.name.as_str();
        let vector = with_retry(self.retry, "embed", move || embedder.embed(name)).await?;

        let index = &self.index;
        let query = vector.as_slice();
        let top_k = self.top_k;
        let matches = with_retry(self.retry, "index query", move || index.query(query, top_k, true)).await?;

        let Some(best) = matches.into_iter().max_by(|a, b| a.score.total_cmp(&b.score)) else {
            return Ok(None);
        };
        if best.score.is_nan() || best.score < self.threshold {
            debug!(food = %mention.name, score = best.score, "semantic match below threshold");
            return Ok(None);
        }
        let Some(meta) = best.metadata else {
            return Ok(None);
        };

        let base_qty = if meta.base_quantity > 0.0 { meta.base_quantity } else { 1.0 };
        let mult = self
            .units
            .scale_factor(mention.quantity, &mention.unit, base_qty, &meta.unit);
        debug!(food = %mention.name, matched = %meta.name, score = best.score, "semantic match");
        Ok(Some(ResolvedFood::scaled(
            meta.name.clone(),
            mention,
            meta.nutrition(),
            mult,
            false,
        )))
    }
}

/// Text match against the curated table. An exact normalized name wins
/// immediately; otherwise the first row (table order) whose name contains
/// the mention, or is contained in it, is taken. First match, not best
/// match.
pub struct CuratedTableTier {
    rows: Vec<ReferenceFoodRow>,
}

impl CuratedTableTier {
    pub fn new(rows: Vec<ReferenceFoodRow>) -> Self {
        Self { rows }
    }

    pub fn find(&self, mention_name: &str) -> Option<&ReferenceFoodRow> {
        let want = normalize_name(mention_name);
        if want.is_empty() {
            return None;
        }

        let mut first_partial = None;
        for row in &self.rows {
            let have = normalize_name(&row.name);
            if have.is_empty() {
                continue;
            }
            if have == want {
                return Some(row);
            }
            if first_partial.is_none() && (have.contains(&want) || want.contains(&have)) {
                first_partial = Some(row);
            }
        }
        first_partial
    }
}

#[async_trait]
impl ResolutionTier for CuratedTableTier {
    fn name(&self) -> &'static str {
        "curated"
    }

    async fn attempt_resolve(&self, mention: &ParsedFoodMention) -> anyhow::Result<Option<ResolvedFood>> {
        Ok(self.find(&mention.name).map(|row| {
            let base_qty = if row.base_quantity > 0.0 { row.base_quantity } else { 1.0 };
            ResolvedFood::scaled(
                row.name.clone(),
                mention,
                row.nutrition(),
                mention.quantity / base_qty,
                false,
            )
        }))
    }
}

/// External nutrition database with a synthetic floor: this tier always
/// produces a result. Real lookups are remembered in the learned table.
pub struct ApiFallbackTier {
    pub lookup: Arc<dyn NutritionLookup>,
    pub learned: Arc<dyn ReferenceStore>,
    pub placeholder: PlaceholderEstimate,
    pub units: UnitTable,
    pub retry: RetryPolicy,
}

impl ApiFallbackTier {
    /// Appends the facts to the learned table on a detached task so a slow
    /// or failing store never delays the resolved item.
    fn remember(&self, facts: &NutritionFacts) {
        let row = ReferenceFoodRow {
            name: facts.name.clone(),
            unit: facts.unit.clone(),
            base_quantity: facts.base_quantity,
            calories: facts.nutrition.calories,
            protein: facts.nutrition.protein,
            fat: facts.nutrition.fat,
            carbs: facts.nutrition.carbs,
            vitamins: None,
            source: FoodSource::Learned,
        };
        let store = self.learned.clone();
        let retry = self.retry;
        let span = info_span!("append_learned", food = %row.name);
        tokio::spawn(
            async move {
                let store = &store;
                let row = &row;
                if let Err(e) = with_retry(retry, "append learned food", move || store.append_learned(row)).await {
                    warn!(error = %e, "append learned food failed");
                }
            }
            .instrument(span),
        );
    }
}

#[async_trait]
impl ResolutionTier for ApiFallbackTier {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn attempt_resolve(&self, mention: &ParsedFoodMention) -> anyhow::Result<Option<ResolvedFood>> {
        let lookup = &self.lookup;
        let name = mention.name.as_str();
        let found = match with_retry(self.retry, "nutrition lookup", move || lookup.search(name)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, food = %mention.name, "nutrition lookup failed");
                None
            }
        };

        let facts = match found {
            Some(facts) => {
                self.remember(&facts);
                facts
            }
            None => {
                info!(food = %mention.name, "no external match, using placeholder estimate");
                self.placeholder.facts_for(&mention.name)
            }
        };

        let mult = self
            .units
            .scale_factor(mention.quantity, &mention.unit, facts.base_quantity, &facts.unit);
        Ok(Some(ResolvedFood::scaled(
            facts.name,
            mention,
            facts.nutrition,
            mult,
            true,
        )))
    }
}
