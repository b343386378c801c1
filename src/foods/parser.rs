use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::dto::MealParse;
use super::validate::validate;
use crate::clients::llm::{ChatMessage, LlmClient};
use crate::error::PipelineError;
use crate::retry::{with_retry, RetryPolicy};

pub const MEAL_PARSE_PROMPT: &str = r#"You are a nutrition tracking assistant. Parse the user's message and extract meal details.

Return JSON only, no markdown or explanation, with this exact structure:
{
  "meal_time": "breakfast" | "lunch" | "snack" | "dinner",
  "foods": [
    {"name": "food name", "quantity": number, "unit": "n" | "cup" | "serving" | "g" | "ml" | "teaspoon" | etc}
  ]
}

Rules:
- Infer meal time from context (morning = breakfast, afternoon = lunch, evening = dinner). Default to "snack" if unclear.
- Normalize quantities: "a couple" = 2, "half" = 0.5, "one" = 1. Extract numbers from "2 chapatis", "1 cup sambar".
- Extract every food item separated by commas or "and". Ignore restaurant or place names; focus on food.
- Use "n" for countable items (eggs, chapatis), "cup" for cups, "serving" for servings, "g" for grams, "ml" for ml.
- If the message does not contain any food items (e.g. greeting, "hi", "thanks"), return {"meal_time": "snack", "foods": []}.
- Never invent food items that the user did not mention."#;

/// Turns free text into a validated [`MealParse`] with the help of an LLM.
pub struct MealParser {
    llm: Arc<dyn LlmClient>,
    retry: RetryPolicy,
}

impl MealParser {
    pub fn new(llm: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Bad model output never fails the call; it degrades to an empty
    /// snack. Only an unreachable model (after retries) is an error.
    #[instrument(skip(self, text))]
    pub async fn parse(&self, text: &str) -> anyhow::Result<MealParse> {
        let messages = [
            ChatMessage::system(MEAL_PARSE_PROMPT),
            ChatMessage::user(format!("User message: {text}\n\nReturn JSON only:")),
        ];
        let llm = &self.llm;
        let messages = &messages;
        let content = with_retry(self.retry, "llm parse", move || llm.run(messages)).await?;

        let parsed = match extract_meal(&content) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "meal extraction failed, treating as no food");
                MealParse::empty()
            }
        };
        let parsed = validate(parsed);
        debug!(period = parsed.meal_period.as_str(), foods = parsed.foods.len(), "meal parsed");
        Ok(parsed)
    }
}

/// Decodes the JSON object embedded in a model answer.
pub fn extract_meal(content: &str) -> Result<MealParse, PipelineError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Parse("empty model response".into()));
    }
    serde_json::from_str(json_object_slice(trimmed)).map_err(|e| PipelineError::Parse(e.to_string()))
}

/// First `{` through last `}`; the whole input when there is no such span.
pub fn json_object_slice(s: &str) -> &str {
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if end > start => &s[start..=end],
        _ => s,
    }
}
