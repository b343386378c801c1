use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use tracing::{error, info, instrument};

use super::dto::SeedFoodRow;
use crate::auth::AdminAuth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub ok: bool,
    pub inserted: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/seed", post(seed_curated))
}

/// POST /admin/seed [{ name, unit?, quantity?, calories?, protein?, fat?, carbs?, vitamins? }]
#[instrument(skip(state, _admin, body))]
pub async fn seed_curated(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Json(body): Json<Vec<SeedFoodRow>>,
) -> Result<Json<SeedResponse>, (StatusCode, String)> {
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Body must be a non-empty array of food rows".into()));
    }
    let rows: Vec<_> = body.into_iter().filter_map(SeedFoodRow::into_curated).collect();
    if rows.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No valid rows (name required)".into()));
    }

    match state.store.insert_curated(&rows).await {
        Ok(inserted) => {
            info!(inserted, "curated foods seeded");
            Ok(Json(SeedResponse { ok: true, inserted }))
        }
        Err(e) => {
            error!(error = ?e, "seed failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "seed failed".into()))
        }
    }
}
