use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::state::AppState;

/// Guards administrative routes with `Authorization: Bearer <ADMIN_SECRET>`.
/// When no secret is configured every request passes.
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.admin_secret.as_deref() else {
            return Ok(AdminAuth);
        };

        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|auth| auth.strip_prefix("Bearer ").or_else(|| auth.strip_prefix("bearer ")))
            .map(str::trim);

        match token {
            Some(t) if t == secret => Ok(AdminAuth),
            _ => Err((StatusCode::UNAUTHORIZED, "Unauthorized".into())),
        }
    }
}
