use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::clients::embeddings::EmbeddingClient;
use crate::error::PipelineError;
use crate::foods::dto::{FoodSource, ReferenceFoodRow};
use crate::index::{record_id, record_key, IndexRecord, SemanticIndex};
use crate::retry::{with_retry, RetryPolicy};

/// One row per normalized `(name, unit)`, curated rows first. A learned
/// row only survives when no curated row has its key. Input order is
/// otherwise kept.
pub fn merge_sources(curated: Vec<ReferenceFoodRow>, learned: Vec<ReferenceFoodRow>) -> Vec<ReferenceFoodRow> {
    let mut seen = HashSet::new();
    let curated = curated.into_iter().map(|r| r.with_source(FoodSource::Curated));
    let learned = learned.into_iter().map(|r| r.with_source(FoodSource::Learned));

    curated
        .chain(learned)
        .filter(|r| !r.name.trim().is_empty())
        .filter(|r| seen.insert(record_key(&r.name, &r.unit)))
        .collect()
}

/// Rebuilds the semantic index from the reference tables.
pub struct Synchronizer {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn SemanticIndex>,
    retry: RetryPolicy,
}

impl Synchronizer {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, index: Arc<dyn SemanticIndex>, retry: RetryPolicy) -> Self {
        Self {
            embedder,
            index,
            retry,
        }
    }

    /// Embeds and upserts every merged row; returns how many records were
    /// written. Running it twice over the same input leaves the index
    /// unchanged.
    #[instrument(skip_all, fields(curated = curated.len(), learned = learned.len()))]
    pub async fn sync(&self, curated: Vec<ReferenceFoodRow>, learned: Vec<ReferenceFoodRow>) -> anyhow::Result<usize> {
        let rows = merge_sources(curated, learned);
        if rows.is_empty() {
            info!("nothing to sync");
            return Ok(0);
        }

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let embedder = &self.embedder;
            let name = row.name.as_str();
            let vector = with_retry(self.retry, "embed", move || embedder.embed(name))
                .await
                .map_err(|e| PipelineError::Sync(format!("embedding {:?}: {e}", row.name)))?;
            records.push(IndexRecord {
                id: record_id(&row.name, &row.unit),
                vector,
                metadata: row,
            });
        }

        let index = &self.index;
        let count = with_retry(self.retry, "index upsert", move || index.upsert(records.clone()))
            .await
            .map_err(|e| PipelineError::Sync(format!("upsert: {e}")))?;
        info!(count, "semantic index synced");
        Ok(count)
    }
}
