pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use services::{merge_sources, Synchronizer};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::routes())
}
