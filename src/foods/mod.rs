pub mod dto;
pub mod handlers;
pub mod parser;
pub mod repo;
mod repo_types;
pub mod resolver;
pub mod tiers;
pub mod validate;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::routes())
}
