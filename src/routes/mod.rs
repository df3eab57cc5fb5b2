use axum::Router;

use crate::state::SharedState;

/// Activity feed and leaderboard endpoints.
pub mod activity;
/// Swagger UI and OpenAPI document.
pub mod docs;
/// Health check endpoint.
pub mod health;
/// Payment provider webhook.
pub mod payments;
/// Pet creation, actions and per-pet streams.
pub mod pets;
/// Public activity SSE stream.
pub mod sse;
/// Realtime WebSocket endpoint.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(pets::router())
        .merge(activity::router())
        .merge(payments::router(state.clone()))
        .merge(sse::router())
        .merge(websocket::router());

    let docs_router = docs::router();

    api_router.merge(docs_router).with_state(state)
}
