use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{error, instrument};

use super::dto::{LogMealRequest, LogMealResponse};
use super::replies::USAGE_HINT;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/meals/log", post(log_meal))
}

/// POST /meals/log { chat_id, text }
/// Acknowledges right away; parsing and lookups run in the background
/// and the outcome is delivered through the reply sink.
#[instrument(skip(state, body))]
pub async fn log_meal(
    State(state): State<AppState>,
    Json(body): Json<LogMealRequest>,
) -> Result<(StatusCode, Json<LogMealResponse>), (StatusCode, String)> {
    let text = body.text.trim().to_string();
    if text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "text is required".into()));
    }
    let chat_id = body.chat_id;

    if text == "/start" {
        if let Err(e) = state.replies.send(chat_id, USAGE_HINT).await {
            error!(error = %e, chat_id, "send usage hint failed");
        }
        return Ok((
            StatusCode::OK,
            Json(LogMealResponse {
                accepted: false,
                reply: Some(USAGE_HINT.to_string()),
            }),
        ));
    }

    let pipeline = state.pipeline();
    state.worker.spawn_detached(
        "meal_pipeline",
        Box::pin(async move { pipeline.run(chat_id, &text).await }),
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(LogMealResponse {
            accepted: true,
            reply: None,
        }),
    ))
}
