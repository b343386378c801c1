use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use super::dto::{MealParse, ParsedFoodMention, DEFAULT_UNIT, UNKNOWN_FOOD};
use crate::error::PipelineError;

const MIN_FOOD_NAME_LENGTH: usize = 2;

const NON_FOOD_WORDS: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank you", "ok", "okay", "yes", "no", "lol", "cool", "nice",
    "k", "nope", "yep", "nah", "asdf", "asdfghjk", "test", "unknown", "other", "none", "idk",
    "idc", "wtf", "omg", "good morning", "good evening", "good afternoon", "good night", "bye",
    "goodbye", "see you",
];

lazy_static! {
    static ref NON_FOOD: HashSet<&'static str> = NON_FOOD_WORDS.iter().copied().collect();
    static ref DIGITS_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref SHORT_WORD_RE: Regex = Regex::new(r"^[a-z]{1,2}$").unwrap();
}

/// Sanitizes a parse regardless of where it came from: trims names,
/// forces bad quantities to 1, defaults blank units and drops mentions
/// without a usable name.
pub fn validate(parsed: MealParse) -> MealParse {
    let foods = parsed
        .foods
        .into_iter()
        .filter_map(|f| {
            let name = f.name.trim().to_string();
            if name.is_empty() || name.eq_ignore_ascii_case(UNKNOWN_FOOD) {
                let drop = PipelineError::ValidationDrop(f.name);
                debug!(reason = %drop, "dropping mention");
                return None;
            }
            let quantity = if f.quantity.is_finite() && f.quantity > 0.0 {
                f.quantity
            } else {
                1.0
            };
            let unit = match f.unit.trim() {
                "" => DEFAULT_UNIT.to_string(),
                u => u.to_string(),
            };
            Some(ParsedFoodMention {
                name,
                quantity,
                unit,
            })
        })
        .collect();

    MealParse {
        meal_period: parsed.meal_period,
        foods,
    }
}

/// Second safety net before resolution: rejects greetings, filler and
/// other names that cannot be a food.
pub fn is_plausible_food(name: &str) -> bool {
    let t = name.trim().to_lowercase();
    if t.chars().count() < MIN_FOOD_NAME_LENGTH {
        return false;
    }
    if NON_FOOD.contains(t.as_str()) {
        return false;
    }
    !(DIGITS_RE.is_match(&t) || SHORT_WORD_RE.is_match(&t))
}
