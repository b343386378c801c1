use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_UNIT: &str = "serving";
pub const UNKNOWN_FOOD: &str = "unknown";

/// Meal slot a message is logged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealPeriod {
    Breakfast,
    Lunch,
    #[default]
    Snack,
    Dinner,
}

impl MealPeriod {
    /// Unrecognized labels degrade to `Snack`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "breakfast" => Self::Breakfast,
            "lunch" => Self::Lunch,
            "dinner" => Self::Dinner,
            _ => Self::Snack,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Snack => "snack",
            Self::Dinner => "dinner",
        }
    }

    /// Capitalized form used in replies and the meal log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Snack => "Snack",
            Self::Dinner => "Dinner",
        }
    }
}

/// One food item as extracted from a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFoodMention {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,
}

impl ParsedFoodMention {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

/// Structured result of parsing one message. Decoding is lenient: the
/// model output is untrusted and gets sanitized by `validate` afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MealParse {
    #[serde(rename = "meal_time", default, deserialize_with = "lenient_period")]
    pub meal_period: MealPeriod,
    #[serde(default, deserialize_with = "lenient_foods")]
    pub foods: Vec<ParsedFoodMention>,
}

impl MealParse {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodSource {
    Curated,
    Learned,
}

impl FoodSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Curated => "curated",
            Self::Learned => "learned",
        }
    }
}

/// Calories and macros for some amount of food.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl Nutrition {
    /// Multiplies first, then rounds: calories to an integer, macros to
    /// one decimal.
    pub fn scaled(&self, multiplier: f64) -> Self {
        Self {
            calories: (self.calories * multiplier).round(),
            protein: round1(self.protein * multiplier),
            fat: round1(self.fat * multiplier),
            carbs: round1(self.carbs * multiplier),
        }
    }
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Nutrition facts for one base serving of a food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFoodRow {
    pub name: String,
    pub unit: String,
    #[serde(rename = "quantity")]
    pub base_quantity: f64,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitamins: Option<String>,
    pub source: FoodSource,
}

impl ReferenceFoodRow {
    pub fn nutrition(&self) -> Nutrition {
        Nutrition {
            calories: self.calories,
            protein: self.protein,
            fat: self.fat,
            carbs: self.carbs,
        }
    }

    pub fn with_source(mut self, source: FoodSource) -> Self {
        self.source = source;
        self
    }
}

/// Row as posted to the seed endpoint; every field is optional and
/// loosely typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFoodRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub calories: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub protein: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fat: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub carbs: f64,
    #[serde(default)]
    pub vitamins: Option<Value>,
}

impl SeedFoodRow {
    /// `None` when the row has no name.
    pub fn into_curated(self) -> Option<ReferenceFoodRow> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        let unit = match self.unit.trim() {
            "" => "n",
            u => u,
        };
        let number = |v: f64| if v.is_finite() { v } else { 0.0 };
        Some(ReferenceFoodRow {
            name: name.to_string(),
            unit: unit.to_string(),
            base_quantity: if self.quantity.is_finite() && self.quantity != 0.0 { self.quantity } else { 1.0 },
            calories: number(self.calories),
            protein: number(self.protein),
            fat: number(self.fat),
            carbs: number(self.carbs),
            vitamins: self.vitamins.and_then(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            }),
            source: FoodSource::Curated,
        })
    }
}

/// A mention with nutrition attached, scaled to what the user ate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFood {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub estimated: bool,
}

impl ResolvedFood {
    pub fn scaled(
        name: impl Into<String>,
        mention: &ParsedFoodMention,
        base: Nutrition,
        multiplier: f64,
        estimated: bool,
    ) -> Self {
        let n = base.scaled(multiplier);
        Self {
            name: name.into(),
            quantity: mention.quantity,
            unit: mention.unit.clone(),
            calories: n.calories,
            protein: n.protein,
            fat: n.fat,
            carbs: n.carbs,
            estimated,
        }
    }
}

/// Lowercase, trim and collapse inner whitespace.
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

// Only JSON numbers count; anything else becomes 0 and is forced to 1 later.
fn lenient_quantity<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    })
}

// Numbers or numeric strings; anything else is 0.
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_period<'de, D: Deserializer<'de>>(d: D) -> Result<MealPeriod, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => MealPeriod::from_label(&s),
        _ => MealPeriod::Snack,
    })
}

// Elements that are not food objects are skipped, not fatal.
fn lenient_foods<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ParsedFoodMention>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| ParsedFoodMention::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
