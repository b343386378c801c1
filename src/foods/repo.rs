use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::dto::{FoodSource, ReferenceFoodRow};
use super::repo_types::ReferenceFoodRecord;

/// Curated and learned reference tables.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Curated rows in the table's natural order (by name).
    async fn read_curated(&self) -> anyhow::Result<Vec<ReferenceFoodRow>>;
    async fn read_learned(&self) -> anyhow::Result<Vec<ReferenceFoodRow>>;
    async fn append_learned(&self, row: &ReferenceFoodRow) -> anyhow::Result<()>;
    async fn insert_curated(&self, rows: &[ReferenceFoodRow]) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgReferenceStore {
    db: PgPool,
}

impl PgReferenceStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReferenceStore for PgReferenceStore {
    async fn read_curated(&self) -> anyhow::Result<Vec<ReferenceFoodRow>> {
        let rows = sqlx::query_as::<_, ReferenceFoodRecord>(
            r#"
            SELECT name, unit, quantity, calories, protein, fat, carbs, vitamins
            FROM reference_foods
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("read reference foods")?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_row(FoodSource::Curated))
            .filter(|r| !r.name.is_empty())
            .collect())
    }

    async fn read_learned(&self) -> anyhow::Result<Vec<ReferenceFoodRow>> {
        let rows = sqlx::query_as::<_, ReferenceFoodRecord>(
            r#"
            SELECT name, unit, quantity, calories, protein, fat, carbs, vitamins
            FROM learned_foods
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("read learned foods")?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_row(FoodSource::Learned))
            .filter(|r| !r.name.is_empty())
            .collect())
    }

    async fn append_learned(&self, row: &ReferenceFoodRow) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO learned_foods (name, unit, quantity, calories, protein, fat, carbs, vitamins)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (name, unit) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                calories = EXCLUDED.calories,
                protein = EXCLUDED.protein,
                fat = EXCLUDED.fat,
                carbs = EXCLUDED.carbs
            "#,
        )
        .bind(row.name.trim())
        .bind(row.unit.trim())
        .bind(row.base_quantity)
        .bind(row.calories)
        .bind(row.protein)
        .bind(row.fat)
        .bind(row.carbs)
        .bind(row.vitamins.as_deref())
        .execute(&self.db)
        .await
        .with_context(|| format!("append learned food {}", row.name))?;
        Ok(())
    }

    async fn insert_curated(&self, rows: &[ReferenceFoodRow]) -> anyhow::Result<u64> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let mut inserted = 0;
        for r in rows {
            let res = sqlx::query(
                r#"
                INSERT INTO reference_foods (name, unit, quantity, calories, protein, fat, carbs, vitamins)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&r.name)
            .bind(&r.unit)
            .bind(r.base_quantity)
            .bind(r.calories)
            .bind(r.protein)
            .bind(r.fat)
            .bind(r.carbs)
            .bind(r.vitamins.as_deref())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert reference food {}", r.name))?;
            inserted += res.rows_affected();
        }
        tx.commit().await.context("commit tx")?;
        Ok(inserted)
    }
}
