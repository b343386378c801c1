use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::FatSecretConfig;
use crate::error::PipelineError;
use crate::foods::dto::Nutrition;

/// Serving-level facts reported by an external nutrition database.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionFacts {
    pub name: String,
    pub base_quantity: f64,
    pub unit: String,
    pub nutrition: Nutrition,
}

/// External food search. `Ok(None)` means "not found" (or not configured);
/// `Err` is reserved for transport failures so callers can retry.
#[async_trait]
pub trait NutritionLookup: Send + Sync {
    async fn search(&self, food_name: &str) -> anyhow::Result<Option<NutritionFacts>>;
}

pub struct FatSecretClient {
    client: Client,
    credentials: Option<(String, String)>,
    token_url: String,
    search_url: String,
}

impl FatSecretClient {
    pub fn new(cfg: &FatSecretConfig) -> Self {
        let credentials = match (&cfg.client_id, &cfg.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.clone(), secret.clone()))
            }
            _ => None,
        };
        Self {
            client: Client::new(),
            credentials,
            token_url: cfg.token_url.clone(),
            search_url: cfg.search_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn access_token(&self, client_id: &str, client_secret: &str) -> anyhow::Result<String> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let res = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", "basic"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(PipelineError::dependency("fatsecret", format!("token error: {}", res.status())).into());
        }
        Ok(res.json::<TokenResponse>().await?.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    foods: Option<FoodList>,
}

#[derive(Debug, Deserialize)]
struct FoodList {
    food: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<FatSecretFood>),
    One(FatSecretFood),
}

#[derive(Debug, Deserialize)]
struct FatSecretFood {
    food_name: Option<String>,
    food_description: Option<String>,
}

#[async_trait]
impl NutritionLookup for FatSecretClient {
    async fn search(&self, food_name: &str) -> anyhow::Result<Option<NutritionFacts>> {
        let Some((id, secret)) = &self.credentials else {
            debug!("fatsecret credentials not configured");
            return Ok(None);
        };

        let token = self.access_token(id, secret).await?;
        let res = self
            .client
            .get(&self.search_url)
            .bearer_auth(token)
            .query(&[
                ("search_expression", food_name),
                ("format", "json"),
                ("max_results", "1"),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(PipelineError::dependency("fatsecret", format!("search error: {}", res.status())).into());
        }

        let body: SearchResponse = res.json().await?;
        let food = match body.foods.and_then(|f| f.food) {
            Some(OneOrMany::One(f)) => Some(f),
            Some(OneOrMany::Many(list)) => list.into_iter().next(),
            None => None,
        };
        let Some(FatSecretFood {
            food_name: Some(name),
            food_description: Some(desc),
        }) = food
        else {
            info!(food = %food_name, "fatsecret returned no match");
            return Ok(None);
        };

        Ok(parse_food_description(&desc).map(|serving| NutritionFacts {
            name,
            base_quantity: serving.quantity,
            unit: serving.unit,
            nutrition: serving.nutrition,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServingDescription {
    pub quantity: f64,
    pub unit: String,
    pub nutrition: Nutrition,
}

lazy_static! {
    static ref PER_RE: Regex = Regex::new(r"(?i)Per\s+([\d./]+)\s*(\w+)\s*[-–]").unwrap();
    static ref CAL_RE: Regex = Regex::new(r"(?i)Calories:\s*([\d.]+)\s*kcal").unwrap();
    static ref FAT_RE: Regex = Regex::new(r"(?i)Fat:\s*([\d.]+)\s*g").unwrap();
    static ref CARB_RE: Regex = Regex::new(r"(?i)Carbs:\s*([\d.]+)\s*g").unwrap();
    static ref PROTEIN_RE: Regex = Regex::new(r"(?i)Protein:\s*([\d.]+)\s*g").unwrap();
}

/// Parses FatSecret's summary line, e.g.
/// `Per 100g - Calories: 22kcal | Fat: 0.34g | Carbs: 3.28g | Protein: 3.09g`.
/// Calories are mandatory; missing macros read as zero.
pub fn parse_food_description(desc: &str) -> Option<ServingDescription> {
    let calories = capture_number(&CAL_RE, desc)?;

    let (quantity, unit) = match PER_RE.captures(desc) {
        Some(caps) => {
            let qty = parse_amount(&caps[1]).filter(|q| *q > 0.0).unwrap_or(1.0);
            (qty, normalize_unit(&caps[2]))
        }
        None => (1.0, "serving".to_string()),
    };

    Some(ServingDescription {
        quantity,
        unit,
        nutrition: Nutrition {
            calories,
            protein: capture_number(&PROTEIN_RE, desc).unwrap_or(0.0),
            fat: capture_number(&FAT_RE, desc).unwrap_or(0.0),
            carbs: capture_number(&CARB_RE, desc).unwrap_or(0.0),
        },
    })
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}

// "1/2" -> 0.5; plain decimals pass through.
fn parse_amount(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => raw.parse().ok(),
    }
}

fn normalize_unit(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let singular = lower.strip_suffix('s').unwrap_or(&lower);
    match singular {
        "gram" => "g".to_string(),
        other => other.to_string(),
    }
}
