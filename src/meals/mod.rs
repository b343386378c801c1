pub mod dto;
pub mod handlers;
pub mod replies;
pub mod repo;
pub mod services;
pub mod worker;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::routes())
}
