use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for KodoMochi Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::pets::create_pet,
        crate::routes::pets::get_pet,
        crate::routes::pets::set_time,
        crate::routes::pets::perform_action,
        crate::routes::pets::pet_events,
        crate::routes::pets::shop,
        crate::routes::activity::recent_activity,
        crate::routes::activity::leaderboard,
        crate::routes::payments::credit,
        crate::routes::sse::activity_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::pet::CreatePetRequest,
            crate::dto::pet::ActionRequest,
            crate::dto::pet::FoodInput,
            crate::dto::pet::SetTimeRequest,
            crate::dto::pet::PetView,
            crate::dto::pet::ActionResponse,
            crate::dto::activity::ActivityEntry,
            crate::dto::activity::LeaderboardEntry,
            crate::dto::payment::CreditRequest,
            crate::dto::shop::ShopItemView,
            crate::dto::sse::Handshake,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "pets", description = "Pet lifecycle and care actions"),
        (name = "community", description = "Activity feed and leaderboard"),
        (name = "payments", description = "Payment provider webhook"),
        (name = "realtime", description = "WebSocket and server-sent events streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_pet_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/pets", "/pets/{userId}", "/pets/{userId}/{action}", "/leaderboard"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
