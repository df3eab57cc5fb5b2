use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while no storage backend is reachable.
    pub status: &'static str,
}

impl HealthResponse {
    /// Storage reachable.
    pub fn ok() -> Self {
        Self { status: "ok" }
    }

    /// Running without storage.
    pub fn degraded() -> Self {
        Self { status: "degraded" }
    }
}
