use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use super::dto::MealEntry;
use super::repo::MealLog;
use super::replies::{format_confirmation, ReplySink, GENERIC_FAILURE, NOT_UNDERSTOOD};
use crate::error::PipelineError;
use crate::foods::parser::MealParser;
use crate::foods::resolver::{FoodResolver, ResolverDeps, ResolverSettings};
use crate::foods::validate::is_plausible_food;
use crate::retry::with_retry;

/// Message in, confirmation out: parse, resolve each mention, log, reply.
pub struct MealPipeline {
    pub parser: MealParser,
    pub deps: ResolverDeps,
    pub settings: ResolverSettings,
    pub meal_log: Arc<dyn MealLog>,
    pub replies: Arc<dyn ReplySink>,
}

impl MealPipeline {
    /// Returns the reply text. Errors are dependency failures after retries.
    #[instrument(skip(self, text))]
    pub async fn process(&self, chat_id: i64, text: &str, today: Date) -> anyhow::Result<String> {
        let parsed = self.parser.parse(text).await?;
        let period = parsed.meal_period;
        let mentions: Vec<_> = parsed
            .foods
            .into_iter()
            .filter(|f| is_plausible_food(&f.name))
            .collect();
        if mentions.is_empty() {
            info!("no plausible food in message");
            return Ok(NOT_UNDERSTOOD.to_string());
        }

        let retry = self.settings.retry;
        let store = &self.deps.store;
        let curated = with_retry(retry, "read curated foods", move || store.read_curated()).await?;
        let resolver = FoodResolver::standard(&self.deps, curated, &self.settings);

        // sequential: one external call in flight per message, items keep message order
        let mut resolved = Vec::with_capacity(mentions.len());
        for mention in &mentions {
            match resolver.resolve(mention).await? {
                Some(food) => resolved.push(food),
                None => {
                    let miss = PipelineError::ResolutionMiss(mention.name.clone());
                    warn!(reason = %miss, "mention dropped");
                }
            }
        }

        let entries: Vec<MealEntry> = resolved
            .iter()
            .map(|f| MealEntry::from_resolved(chat_id, today, period, f))
            .collect();
        if !entries.is_empty() {
            let log = &self.meal_log;
            let entries = entries.as_slice();
            with_retry(retry, "append meal entries", move || log.append(entries)).await?;
        }

        info!(period = period.as_str(), items = resolved.len(), "meal logged");
        Ok(format_confirmation(period, &resolved))
    }

    /// Background entry point: always replies, never returns an error.
    pub async fn run(&self, chat_id: i64, text: &str) {
        let today = OffsetDateTime::now_utc().date();
        let reply = match self.process(chat_id, text, today).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = ?e, chat_id, "meal pipeline failed");
                GENERIC_FAILURE.to_string()
            }
        };
        if let Err(e) = self.replies.send(chat_id, &reply).await {
            error!(error = %e, chat_id, "send reply failed");
        }
    }
}
