//! Route modules for the Parapheur server

pub mod documents;
pub mod health;
pub mod notify;
pub mod sign;
pub mod upload;

use axum::Router;

use crate::state::AppState;

/// Assemble the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api", api_router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .merge(upload::router())
        .merge(sign::router())
        .merge(documents::router())
        .merge(notify::router())
}
