use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};
use validator::Validate;

use crate::{
    dto::{payment::CreditRequest, pet::PetView},
    error::{AppError, ErrorBody},
    services::pet_service,
    state::SharedState,
};

const PAYMENT_TOKEN_HEADER: &str = "x-payment-token";

/// Webhook called by the payment provider once an order is confirmed.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/payments/credit", post(credit))
        .route_layer(middleware::from_fn_with_state(state, require_payment_token))
}

#[utoipa::path(
    post,
    path = "/payments/credit",
    tag = "payments",
    params(("X-Payment-Token" = String, Header, description = "Shared secret of the payment webhook")),
    request_body = CreditRequest,
    responses(
        (status = 200, description = "Credited pet", body = PetView),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No pet for this user", body = ErrorBody)
    )
)]
/// Credit coins and crowns bought through the payment provider.
pub async fn credit(
    State(state): State<SharedState>,
    Json(payload): Json<CreditRequest>,
) -> Result<Json<PetView>, AppError> {
    payload.validate()?;
    Ok(Json(pet_service::credit(&state, payload).await?))
}

async fn require_payment_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(PAYMENT_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    check_payment_token(state.payment_token(), provided)?;
    Ok(next.run(req).await)
}

fn check_payment_token(expected: Option<&str>, provided: Option<&str>) -> Result<(), AppError> {
    let expected =
        expected.ok_or_else(|| AppError::Unauthorized("payment hook disabled".into()))?;
    match provided {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(AppError::Unauthorized("invalid payment token".into())),
        None => Err(AppError::Unauthorized(
            "missing payment token header `X-Payment-Token`".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_must_match_the_configured_secret() {
        assert!(check_payment_token(Some("secret"), Some("secret")).is_ok());
        assert!(matches!(
            check_payment_token(Some("secret"), Some("guess")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            check_payment_token(Some("secret"), None),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            check_payment_token(None, Some("secret")),
            Err(AppError::Unauthorized(ref msg)) if msg == "payment hook disabled"
        ));
    }
}
