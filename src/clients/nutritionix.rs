use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::fatsecret::{NutritionFacts, NutritionLookup};
use crate::config::NutritionixConfig;
use crate::error::PipelineError;
use crate::foods::dto::{Nutrition, DEFAULT_UNIT};

/// Nutritionix instant search. Used when FatSecret is not configured.
pub struct NutritionixClient {
    client: Client,
    credentials: Option<(String, String)>,
    search_url: String,
}

impl NutritionixClient {
    pub fn new(cfg: &NutritionixConfig) -> Self {
        let credentials = match (&cfg.app_id, &cfg.api_key) {
            (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => Some((id.clone(), key.clone())),
            _ => None,
        };
        Self {
            client: Client::new(),
            credentials,
            search_url: cfg.search_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct InstantResponse {
    #[serde(default)]
    common: Vec<InstantItem>,
    #[serde(default)]
    branded: Vec<InstantItem>,
}

#[derive(Debug, Deserialize)]
struct InstantItem {
    food_name: Option<String>,
    serving_qty: Option<f64>,
    serving_unit: Option<String>,
    nf_calories: Option<f64>,
    nf_protein: Option<f64>,
    nf_total_fat: Option<f64>,
    nf_total_carbohydrate: Option<f64>,
}

impl InstantItem {
    fn into_facts(self) -> Option<NutritionFacts> {
        let name = self.food_name.filter(|n| !n.trim().is_empty())?;
        let unit = self
            .serving_unit
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());
        Some(NutritionFacts {
            name,
            base_quantity: self.serving_qty.filter(|q| *q > 0.0).unwrap_or(1.0),
            unit,
            nutrition: Nutrition {
                calories: self.nf_calories.unwrap_or(0.0),
                protein: self.nf_protein.unwrap_or(0.0),
                fat: self.nf_total_fat.unwrap_or(0.0),
                carbs: self.nf_total_carbohydrate.unwrap_or(0.0),
            },
        })
    }
}

#[async_trait]
impl NutritionLookup for NutritionixClient {
    async fn search(&self, food_name: &str) -> anyhow::Result<Option<NutritionFacts>> {
        let Some((app_id, api_key)) = &self.credentials else {
            debug!("nutritionix credentials not configured");
            return Ok(None);
        };

        let res = self
            .client
            .get(&self.search_url)
            .header("x-app-id", app_id)
            .header("x-app-key", api_key)
            .query(&[("query", food_name)])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(PipelineError::dependency("nutritionix", format!("search error: {}", res.status())).into());
        }

        let body: InstantResponse = res.json().await?;
        // common foods first, branded only when there is no common hit
        let item = body.common.into_iter().next().or_else(|| body.branded.into_iter().next());
        let facts = item.and_then(InstantItem::into_facts);
        if facts.is_none() {
            info!(food = %food_name, "nutritionix returned no match");
        }
        Ok(facts)
    }
}
