use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{foods, meals, sync};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(meals::router())
                .merge(foods::router())
                .merge(sync::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foods::repo::ReferenceStore;
    use crate::index::InMemoryIndex;
    use crate::testing::{reference_row, MemoryReferenceStore, RecordingReplySink, RecordingWorker, StaticEmbedder};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn log_meal_is_accepted_and_deferred() {
        let worker = Arc::new(RecordingWorker::default());
        let replies = Arc::new(RecordingReplySink::default());
        let mut state = AppState::fake();
        state.worker = worker.clone();
        state.replies = replies.clone();

        let res = build_app(state)
            .oneshot(post_json("/api/v1/meals/log", r#"{"chat_id": 5, "text": "hello"}"#, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(res).await, serde_json::json!({"accepted": true}));
        assert_eq!(worker.names(), vec!["meal_pipeline"]);
        assert!(replies.sent().is_empty());

        worker.run_all().await;
        let sent = replies.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 5);
    }

    #[tokio::test]
    async fn start_command_replies_synchronously() {
        let worker = Arc::new(RecordingWorker::default());
        let replies = Arc::new(RecordingReplySink::default());
        let mut state = AppState::fake();
        state.worker = worker.clone();
        state.replies = replies.clone();

        let res = build_app(state)
            .oneshot(post_json("/api/v1/meals/log", r#"{"chat_id": 5, "text": " /start "}"#, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(worker.names().is_empty());
        assert_eq!(replies.sent().len(), 1);
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let res = build_app(AppState::fake())
            .oneshot(post_json("/api/v1/meals/log", r#"{"chat_id": 5, "text": "  "}"#, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_routes_require_secret() {
        for token in [None, Some("wrong")] {
            let res = build_app(AppState::fake())
                .oneshot(post_json("/api/v1/admin/sync", "", token))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn admin_routes_are_open_without_secret() {
        let mut state = AppState::fake();
        let mut config = (*state.config).clone();
        config.admin_secret = None;
        state.config = Arc::new(config);

        let res = build_app(state)
            .oneshot(post_json("/api/v1/admin/sync", "", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, serde_json::json!({"ok": true, "count": 0}));
    }

    #[tokio::test]
    async fn sync_indexes_curated_and_learned_rows() {
        let store = Arc::new(MemoryReferenceStore::with_curated(vec![reference_row("Egg", "n", 1.0, 78.0, 6.3)]));
        store
            .append_learned(&reference_row("Paneer", "g", 100.0, 265.0, 18.0))
            .await
            .unwrap();
        let index = Arc::new(InMemoryIndex::new());
        let mut state = AppState::fake();
        state.store = store;
        state.index = index.clone();
        state.embedder = Arc::new(StaticEmbedder::new(&[("egg", vec![1.0, 0.0, 0.0])]));

        let res = build_app(state)
            .oneshot(post_json("/api/v1/admin/sync", "", Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, serde_json::json!({"ok": true, "count": 2}));
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn sync_failure_is_a_generic_500() {
        let mut state = AppState::fake();
        state.store = Arc::new(MemoryReferenceStore::with_curated(vec![reference_row("Egg", "n", 1.0, 78.0, 6.3)]));
        state.embedder = Arc::new(StaticEmbedder::failing());

        let res = build_app(state)
            .oneshot(post_json("/api/v1/admin/sync", "", Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"sync failed");
    }

    #[tokio::test]
    async fn seed_inserts_named_rows() {
        let store = Arc::new(MemoryReferenceStore::default());
        let mut state = AppState::fake();
        state.store = store.clone();

        let res = build_app(state)
            .oneshot(post_json(
                "/api/v1/admin/seed",
                r#"[{"name": "Idli", "calories": 58}, {"name": ""}, {"name": "Dosa", "unit": "n", "calories": 170}]"#,
                Some("s3cret"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, serde_json::json!({"ok": true, "inserted": 2}));
        let names: Vec<_> = store.curated().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Idli", "Dosa"]);
    }

    #[tokio::test]
    async fn seed_rejects_empty_or_nameless_bodies() {
        for body in ["[]", r#"[{"name": "  "}, {"calories": 5}]"#] {
            let res = build_app(AppState::fake())
                .oneshot(post_json("/api/v1/admin/seed", body, Some("s3cret")))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body}");
        }
    }
}
