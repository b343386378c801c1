use async_trait::async_trait;
use tracing::info;

use crate::foods::dto::{round1, MealPeriod, ResolvedFood};

pub const USAGE_HINT: &str =
    "Send what you ate, e.g. \"2 eggs for breakfast\" or \"2 chapatis, 1 cup sambar for lunch\".";
pub const NOT_UNDERSTOOD: &str = "I didn't understand that. Try: 2 eggs for breakfast";
pub const GENERIC_FAILURE: &str = "Something went wrong; try again.";

/// Outbound channel to the user (chat adapter).
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
}

/// Writes replies to the log; used when no chat adapter is wired in.
#[derive(Debug, Default, Clone)]
pub struct LoggingReplySink;

#[async_trait]
impl ReplySink for LoggingReplySink {
    async fn send(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        info!(chat_id, reply = %text, "reply");
        Ok(())
    }
}

/// "✅ Lunch logged: 300 kcal, 10g protein" plus one line per item.
pub fn format_confirmation(period: MealPeriod, foods: &[ResolvedFood]) -> String {
    // fold from +0.0; an empty f64 sum is -0.0 and would print "-0"
    let calories = foods.iter().fold(0.0_f64, |acc, f| acc + f.calories);
    let protein = foods.iter().fold(0.0_f64, |acc, f| acc + f.protein);

    let mut lines = vec![format!(
        "✅ {} logged: {} kcal, {}g protein",
        period.label(),
        calories.round(),
        round1(protein)
    )];
    for f in foods {
        let est = if f.estimated { " (estimated)" } else { "" };
        lines.push(format!("• {} {}: {} kcal{est}", f.quantity, f.name, f.calories));
    }
    lines.join("\n")
}
