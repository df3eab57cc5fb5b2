use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use validator::Validate;

use crate::{
    dto::activity::{ActivityEntry, LeaderboardEntry, LeaderboardQuery},
    error::{AppError, ErrorBody},
    services::activity_service,
    state::SharedState,
};

/// Community endpoints shared by every player.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/activity", get(recent_activity))
        .route("/leaderboard", get(leaderboard))
}

/// Return the 50 most recent actions, newest first.
#[utoipa::path(
    get,
    path = "/activity",
    tag = "community",
    responses(
        (status = 200, description = "Recent activity", body = [ActivityEntry]),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn recent_activity(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    Ok(Json(activity_service::recent_activity(&state).await?))
}

/// Return the richest pets.
#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "community",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Top pets by coins", body = [LeaderboardEntry]),
        (status = 400, description = "Invalid limit", body = ErrorBody)
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    query.validate()?;
    Ok(Json(activity_service::leaderboard(&state, &query).await?))
}
