use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::dto::MealEntry;

/// Append-only meal log.
#[async_trait]
pub trait MealLog: Send + Sync {
    async fn append(&self, entries: &[MealEntry]) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgMealLog {
    db: PgPool,
}

impl PgMealLog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealLog for PgMealLog {
    async fn append(&self, entries: &[MealEntry]) -> anyhow::Result<u64> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let mut inserted = 0;
        for e in entries {
            let res = sqlx::query(
                r#"
                INSERT INTO meal_entries
                    (chat_id, logged_on, meal_period, food_item, quantity,
                     calories, protein, fat, carbs, estimated)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(e.chat_id)
            .bind(e.logged_on)
            .bind(&e.meal_period)
            .bind(&e.food_item)
            .bind(&e.quantity)
            .bind(e.calories)
            .bind(e.protein)
            .bind(e.fat)
            .bind(e.carbs)
            .bind(e.estimated)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert meal entry {}", e.food_item))?;
            inserted += res.rows_affected();
        }
        tx.commit().await.context("commit tx")?;
        Ok(inserted)
    }
}
