use sqlx::FromRow;

use super::dto::{FoodSource, ReferenceFoodRow};

/// Row as stored in `reference_foods` / `learned_foods`.
#[derive(Debug, FromRow)]
pub struct ReferenceFoodRecord {
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub vitamins: Option<String>,
}

impl ReferenceFoodRecord {
    /// Cleans up loosely typed sheet-style data on the way in.
    pub fn into_row(self, source: FoodSource) -> ReferenceFoodRow {
        let unit = self.unit.trim();
        ReferenceFoodRow {
            name: self.name.trim().to_string(),
            unit: if unit.is_empty() { "n".into() } else { unit.to_string() },
            base_quantity: if self.quantity > 0.0 { self.quantity } else { 1.0 },
            calories: self.calories.max(0.0),
            protein: self.protein.max(0.0),
            fat: self.fat.max(0.0),
            carbs: self.carbs.max(0.0),
            vitamins: self.vitamins,
            source,
        }
    }
}
