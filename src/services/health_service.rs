use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the storage backend answers, flagging degraded mode on failure.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.pet_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
                state.update_degraded(true);
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, StateParts, testing::test_app},
    };

    #[tokio::test]
    async fn reports_degraded_without_storage() {
        let state = AppState::new(StateParts::new(AppConfig::default()));
        assert_eq!(health_status(&state).await.status, "degraded");
    }

    #[tokio::test]
    async fn reports_ok_with_a_healthy_store() {
        let app = test_app(AppConfig::default()).await;
        assert_eq!(health_status(&app.state).await.status, "ok");
    }
}
