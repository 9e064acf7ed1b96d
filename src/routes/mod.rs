//! HTTP surface: thin handlers delegating to the service layer.

use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod matches;
pub mod ratings;
pub mod schedule;
pub mod seasons;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(matches::router())
        .merge(seasons::router())
        .merge(schedule::router())
        .merge(ratings::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
