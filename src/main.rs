//! KodoMochi Back binary entrypoint wiring REST, WebSocket, SSE, the tick
//! scheduler and the selected storage backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use kodomochi_back::{
    config::AppConfig,
    dao::{
        pet_store::{PetStore, memory::MemoryPetStore},
        storage::StorageError,
    },
    routes,
    services::{notifications::NotificationSink, storage_supervisor, tick_scheduler},
    state::{AppState, SharedState, StateParts},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(state_parts(AppConfig::load()));

    spawn_storage(app_state.clone())?;
    let scheduler = tick_scheduler::spawn(app_state.clone());

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    scheduler.stop().await;
    Ok(())
}

fn state_parts(config: AppConfig) -> StateParts {
    let mut parts = StateParts::new(config);
    parts.payment_token = env::var("PAYMENT_HOOK_TOKEN").ok();
    if parts.payment_token.is_none() {
        warn!("PAYMENT_HOOK_TOKEN not set; payment webhook disabled");
    }
    if let Some(notifier) = telegram_notifier() {
        info!("telegram notifications enabled");
        parts.notifier = notifier;
    }
    parts
}

#[cfg(feature = "telegram-notify")]
fn telegram_notifier() -> Option<Arc<dyn NotificationSink>> {
    kodomochi_back::services::notifications::TelegramNotificationSink::from_env()
        .map(|sink| Arc::new(sink) as Arc<dyn NotificationSink>)
}

#[cfg(not(feature = "telegram-notify"))]
fn telegram_notifier() -> Option<Arc<dyn NotificationSink>> {
    None
}

/// Start the storage supervisor for the backend named by `STORAGE_BACKEND`
/// (`memory`, `mongo` or `couch`; defaults to `memory`).
fn spawn_storage(state: SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".into());
    info!(backend, "selecting storage backend");

    match backend.as_str() {
        "memory" => {
            // Kept outside the closure so reconnects do not wipe the data.
            let store = MemoryPetStore::new();
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn PetStore>) }
            }));
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use kodomochi_back::dao::pet_store::mongodb::{MongoConfig, MongoPetStore};

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await?;
                let store = MongoPetStore::connect(config).await?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn PetStore>)
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use kodomochi_back::dao::pet_store::couchdb::{CouchConfig, CouchPetStore};

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env()?;
                let store = CouchPetStore::connect(config).await?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn PetStore>)
            }));
        }
        other => anyhow::bail!("unsupported STORAGE_BACKEND `{other}`"),
    }
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
