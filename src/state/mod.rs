pub mod channels;
pub mod engine;
/// Domain pet record.
pub mod pet;
pub mod random;
mod sse;
pub mod transitions;

use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::pet_store::PetStore,
    error::ServiceError,
    services::notifications::{LogNotificationSink, NotificationSink},
};

pub use self::sse::SseHub;
use self::{channels::PetChannels, random::RandomSource, transitions::PetLocks};

/// Shared handle passed to every handler and background task.
pub type SharedState = Arc<AppState>;
/// Upper bound for one user-initiated read-modify-write cycle.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(5);
const ACTIVITY_SSE_CAPACITY: usize = 64;

/// Central application state: storage handle, engine configuration,
/// randomness, realtime channels and per-user locks.
pub struct AppState {
    pet_store: RwLock<Option<Arc<dyn PetStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    rng: Arc<dyn RandomSource>,
    notifier: Arc<dyn NotificationSink>,
    pet_channels: PetChannels,
    activity_sse: SseHub,
    pet_locks: PetLocks,
    action_timeout: Duration,
    payment_token: Option<String>,
}

/// Collaborators injected into [`AppState`].
pub struct StateParts {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Randomness used by the engine.
    pub rng: Arc<dyn RandomSource>,
    /// Destination of out-of-band user messages.
    pub notifier: Arc<dyn NotificationSink>,
    /// Shared secret expected from the payment webhook; `None` disables it.
    pub payment_token: Option<String>,
}

impl StateParts {
    /// Production collaborators for `config`.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            rng: Arc::new(random::ThreadRandom),
            notifier: Arc::new(LogNotificationSink),
            payment_token: None,
        }
    }
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(parts: StateParts) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            pet_store: RwLock::new(None),
            degraded: degraded_tx,
            config: parts.config,
            rng: parts.rng,
            notifier: parts.notifier,
            pet_channels: PetChannels::new(),
            activity_sse: SseHub::new(ACTIVITY_SSE_CAPACITY),
            pet_locks: PetLocks::new(),
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            payment_token: parts.payment_token.filter(|token| !token.is_empty()),
        })
    }

    /// Obtain a handle to the current pet store, if one is installed.
    pub async fn pet_store(&self) -> Option<Arc<dyn PetStore>> {
        self.pet_store.read().await.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while storage is unhealthy.
    pub async fn require_store(&self) -> Result<Arc<dyn PetStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.pet_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new pet store implementation and leave degraded mode.
    pub async fn set_pet_store(&self, store: Arc<dyn PetStore>) {
        {
            let mut guard = self.pet_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Randomness source of the engine.
    pub fn rng(&self) -> &dyn RandomSource {
        self.rng.as_ref()
    }

    /// Sink for push notifications to pet owners.
    pub fn notifier(&self) -> &dyn NotificationSink {
        self.notifier.as_ref()
    }

    /// Per-user pet update channels.
    pub fn pet_channels(&self) -> &PetChannels {
        &self.pet_channels
    }

    /// Broadcast hub of the public activity feed.
    pub fn activity_sse(&self) -> &SseHub {
        &self.activity_sse
    }

    /// Per-user locks guarding read-modify-write cycles.
    pub fn pet_locks(&self) -> &PetLocks {
        &self.pet_locks
    }

    /// Shared secret of the payment webhook, if enabled.
    pub fn payment_token(&self) -> Option<&str> {
        self.payment_token.as_deref()
    }

    /// Run `work` while holding the lock of `user_id`, bounded by the action timeout.
    pub async fn with_pet_lock<F, Fut, T>(&self, user_id: &str, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        self.with_pet_lock_for(user_id, self.action_timeout, work)
            .await
    }

    /// Same as [`AppState::with_pet_lock`] with an explicit time limit.
    pub async fn with_pet_lock_for<F, Fut, T>(
        &self,
        user_id: &str,
        limit: Duration,
        work: F,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        self.pet_locks.run(user_id, limit, work).await
    }
}

/// Wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        config::AppConfig, dao::pet_store::memory::MemoryPetStore,
        services::notifications::NotificationSink, state::random::ScriptedRandom,
    };

    /// Notification sink remembering every message.
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        pub fn messages_for(&self, user_id: &str) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(user, _)| user == user_id)
                .map(|(_, message)| message.clone())
                .collect()
        }
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, user_id: &str, message: &str) {
            self.sent
                .lock()
                .unwrap()
                .push((user_id.to_owned(), message.to_owned()));
        }
    }

    pub struct TestApp {
        pub state: SharedState,
        pub store: MemoryPetStore,
        pub rng: Arc<ScriptedRandom>,
        pub sink: Arc<RecordingSink>,
    }

    /// Fully wired state backed by the in-memory store and scripted randomness.
    pub async fn test_app(config: AppConfig) -> TestApp {
        let rng = Arc::new(ScriptedRandom::never());
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::new(StateParts {
            config,
            rng: rng.clone(),
            notifier: sink.clone(),
            payment_token: Some("secret".into()),
        });
        let store = MemoryPetStore::new();
        state.set_pet_store(Arc::new(store.clone())).await;
        TestApp {
            state,
            store,
            rng,
            sink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(StateParts::new(AppConfig::default()));
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_pet_store(Arc::new(crate::dao::pet_store::memory::MemoryPetStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_store().await.is_ok());
    }
}
