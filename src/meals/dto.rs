use serde::{Deserialize, Serialize};
use time::Date;

use crate::foods::dto::{MealPeriod, ResolvedFood};

#[derive(Debug, Deserialize)]
pub struct LogMealRequest {
    pub chat_id: i64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct LogMealResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

/// One logged food item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealEntry {
    pub chat_id: i64,
    pub logged_on: Date,
    pub meal_period: String,
    pub food_item: String,
    pub quantity: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub estimated: bool,
}

impl MealEntry {
    pub fn from_resolved(chat_id: i64, logged_on: Date, period: MealPeriod, food: &ResolvedFood) -> Self {
        Self {
            chat_id,
            logged_on,
            meal_period: period.label().to_string(),
            food_item: food.name.clone(),
            quantity: quantity_text(food.quantity, &food.unit),
            calories: food.calories,
            protein: food.protein,
            fat: food.fat,
            carbs: food.carbs,
            estimated: food.estimated,
        }
    }
}

/// `"2"` for countable items, `"0.5 cup"` otherwise.
pub fn quantity_text(quantity: f64, unit: &str) -> String {
    let unit = unit.trim();
    if unit.is_empty() || unit == "n" {
        quantity.to_string()
    } else {
        format!("{quantity} {unit}")
    }
}
