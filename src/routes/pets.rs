use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::Stream;
use validator::Validate;

use crate::{
    dto::{
        pet::{ActionRequest, ActionResponse, CreatePetRequest, PetView, SetTimeRequest},
        shop::ShopItemView,
        validation::validate_user_id,
    },
    error::{AppError, ErrorBody},
    services::{pet_service, sse_service},
    state::{SharedState, engine::PetAction},
};

/// Pet lifecycle, care actions and the shop catalog.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/pets", post(create_pet))
        .route("/pets/{userId}", get(get_pet))
        .route("/pets/{userId}/setTime", post(set_time))
        .route("/pets/{userId}/events", get(pet_events))
        .route("/pets/{userId}/{action}", post(perform_action))
        .route("/shop", get(shop))
}

fn checked_user_id(user_id: String) -> Result<String, AppError> {
    validate_user_id(&user_id)
        .map_err(|err| AppError::BadRequest(format!("invalid user id: {err}")))?;
    Ok(user_id)
}

/// Hatch a pet, or return the existing one unchanged.
#[utoipa::path(
    post,
    path = "/pets",
    tag = "pets",
    request_body = CreatePetRequest,
    responses(
        (status = 200, description = "Pet of the user", body = PetView),
        (status = 400, description = "Invalid identifiers", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn create_pet(
    State(state): State<SharedState>,
    Json(payload): Json<CreatePetRequest>,
) -> Result<Json<PetView>, AppError> {
    payload.validate()?;
    Ok(Json(pet_service::create_pet(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/pets/{userId}",
    tag = "pets",
    params(("userId" = String, Path, description = "Owner of the pet")),
    responses(
        (status = 200, description = "Current pet state", body = PetView),
        (status = 404, description = "No pet for this user", body = ErrorBody)
    )
)]
/// Return the current state of a pet.
pub async fn get_pet(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<PetView>, AppError> {
    let user_id = checked_user_id(user_id)?;
    Ok(Json(pet_service::get_pet(&state, &user_id).await?))
}

/// Set the pet's local clock once.
#[utoipa::path(
    post,
    path = "/pets/{userId}/setTime",
    tag = "pets",
    params(("userId" = String, Path, description = "Owner of the pet")),
    request_body = SetTimeRequest,
    responses(
        (status = 200, description = "Updated pet", body = ActionResponse),
        (status = 400, description = "Invalid time or clock already set", body = ErrorBody)
    )
)]
pub async fn set_time(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Json(payload): Json<SetTimeRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let user_id = checked_user_id(user_id)?;
    payload.validate()?;
    let action = PetAction::SetTime {
        hours: payload.hours,
        minutes: payload.minutes,
    };
    Ok(Json(
        pet_service::perform_action(&state, &user_id, action).await?,
    ))
}

/// Perform a care action. Parameters depend on the action: `feed` needs a
/// `foodType`, `purchaseItem` an `itemId`.
#[utoipa::path(
    post,
    path = "/pets/{userId}/{action}",
    tag = "pets",
    params(
        ("userId" = String, Path, description = "Owner of the pet"),
        ("action" = String, Path, description = "feed, play, clean, toggleLight, medicine, revive, watchVideo, buyCrown, purchaseItem, collectCoin or reset")
    ),
    request_body(content = ActionRequest, description = "Action parameters, may be omitted"),
    responses(
        (status = 200, description = "Updated pet", body = ActionResponse),
        (status = 400, description = "Unknown or refused action", body = ErrorBody),
        (status = 404, description = "No pet for this user", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn perform_action(
    State(state): State<SharedState>,
    Path((user_id, action)): Path<(String, String)>,
    payload: Option<Json<ActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let user_id = checked_user_id(user_id)?;
    let body = payload.map(|Json(body)| body).unwrap_or_default();
    let action = pet_service::parse_action(&action, body)?;
    Ok(Json(
        pet_service::perform_action(&state, &user_id, action).await?,
    ))
}

/// Stream the updates of one pet.
#[utoipa::path(
    get,
    path = "/pets/{userId}/events",
    tag = "realtime",
    params(("userId" = String, Path, description = "Owner of the pet")),
    responses((status = 200, description = "Pet SSE stream", content_type = "text/event-stream", body = String))
)]
pub async fn pet_events(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let user_id = checked_user_id(user_id)?;
    Ok(sse_service::pet_stream(state, user_id))
}

#[utoipa::path(
    get,
    path = "/shop",
    tag = "pets",
    responses((status = 200, description = "Shop catalog", body = [ShopItemView]))
)]
/// List the shop catalog.
pub async fn shop(State(state): State<SharedState>) -> Json<Vec<ShopItemView>> {
    Json(pet_service::shop_catalog(&state))
}
