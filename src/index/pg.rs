use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use tracing::debug;

use super::{rank, IndexMatch, IndexRecord, SemanticIndex};
use crate::foods::dto::ReferenceFoodRow;

/// Vectors kept in Postgres (`food_vectors`, embedding as `REAL[]`).
/// Similarity is computed in process; the reference tables are small.
#[derive(Clone)]
pub struct PgVectorIndex {
    db: PgPool,
}

impl PgVectorIndex {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SemanticIndex for PgVectorIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        with_metadata: bool,
    ) -> anyhow::Result<Vec<IndexMatch>> {
        let rows = sqlx::query_as::<_, (String, Vec<f32>, Json<ReferenceFoodRow>)>(
            r#"
            SELECT id, embedding, metadata
            FROM food_vectors
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("load food vectors")?;

        Ok(rank(
            vector,
            rows.iter()
                .map(|(id, embedding, meta)| (id.as_str(), embedding.as_slice(), &meta.0)),
            top_k,
            with_metadata,
        ))
    }

    async fn upsert(&self, records: Vec<IndexRecord>) -> anyhow::Result<usize> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        for r in &records {
            sqlx::query(
                r#"
                INSERT INTO food_vectors (id, embedding, metadata)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET
                    embedding = EXCLUDED.embedding,
                    metadata = EXCLUDED.metadata,
                    updated_at = now()
                "#,
            )
            .bind(&r.id)
            .bind(&r.vector)
            .bind(Json(&r.metadata))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("upsert food vector {}", r.id))?;
        }
        tx.commit().await.context("commit tx")?;
        debug!(count = records.len(), "food vectors upserted");
        Ok(records.len())
    }
}
