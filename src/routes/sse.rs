use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/activity",
    tag = "realtime",
    responses((status = 200, description = "Public activity SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream every successful action as it happens.
pub async fn activity_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New activity SSE connection");
    sse_service::activity_stream(&state)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/activity", get(activity_stream))
}
