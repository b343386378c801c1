//! Semantic (vector) index over reference foods. The index is derived
//! data: the reference tables stay the source of truth and `sync` can
//! rebuild it at any time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::foods::dto::{normalize_name, ReferenceFoodRow};

mod memory;
mod pg;

pub use memory::InMemoryIndex;
pub use pg::PgVectorIndex;

/// Index backends bound identifier length; 32 hex chars fits all of them.
pub const RECORD_ID_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ReferenceFoodRow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Option<ReferenceFoodRow>,
}

#[async_trait]
pub trait SemanticIndex: Send + Sync {
    /// Nearest neighbours of `vector`, best first.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        with_metadata: bool,
    ) -> anyhow::Result<Vec<IndexMatch>>;

    /// Inserts or overwrites records by id; returns how many were written.
    async fn upsert(&self, records: Vec<IndexRecord>) -> anyhow::Result<usize>;
}

/// Normalized `(name, unit)` content key.
pub fn record_key(name: &str, unit: &str) -> String {
    format!("{}|{}", normalize_name(name), normalize_name(unit))
}

/// Content-addressed record id: same key, same id, so re-syncing
/// overwrites instead of duplicating.
pub fn record_id(name: &str, unit: &str) -> String {
    let digest = Sha256::digest(record_key(name, unit).as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(RECORD_ID_LEN);
    id
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Scores every candidate against `query` and keeps the best `top_k`.
pub(crate) fn rank<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = (&'a str, &'a [f32], &'a ReferenceFoodRow)>,
    top_k: usize,
    with_metadata: bool,
) -> Vec<IndexMatch> {
    let mut scored: Vec<IndexMatch> = candidates
        .into_iter()
        .map(|(id, vector, metadata)| IndexMatch {
            id: id.to_string(),
            score: cosine_similarity(query, vector),
            metadata: with_metadata.then(|| metadata.clone()),
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    scored
}
