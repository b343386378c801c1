use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use tracing::{error, instrument};

use crate::auth::AdminAuth;
use crate::retry::with_retry;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub ok: bool,
    pub count: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/sync", post(run_sync))
}

/// POST /admin/sync
/// Rebuilds the semantic index from curated + learned rows.
#[instrument(skip(state, _admin))]
pub async fn run_sync(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<SyncResponse>, (StatusCode, String)> {
    let retry = state.config.retry;
    let store = &state.store;
    let loaded = async {
        let curated = with_retry(retry, "read curated foods", move || store.read_curated()).await?;
        let learned = with_retry(retry, "read learned foods", move || store.read_learned()).await?;
        anyhow::Ok((curated, learned))
    }
    .await;

    let result = match loaded {
        Ok((curated, learned)) => state.synchronizer().sync(curated, learned).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(count) => Ok(Json(SyncResponse { ok: true, count })),
        Err(e) => {
            error!(error = ?e, "sync failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "sync failed".into()))
        }
    }
}
