//! Periodic sweep applying the passive tick to every pet.

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::pet_events::publish_pet,
    state::{
        SharedState,
        engine::{self, TickOutcome},
        now_ms,
        pet::Pet,
    },
};

/// Counters describing one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Pets whose tick was applied and saved.
    pub ticked: usize,
    /// Dead pets left untouched.
    pub skipped_dead: usize,
    /// Pets that could not be loaded, found or saved.
    pub failed: usize,
}

enum PetTick {
    Ticked(TickOutcome),
    Dead,
    Missing,
}

/// Running scheduler. Dropping the handle also ends the loop, without waiting
/// for an in-flight sweep; use [`SchedulerHandle::stop`] to wait.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the scheduler to stop and wait for the current sweep to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(err) = self.join.await {
            warn!(error = %err, "tick scheduler task ended abnormally");
        }
    }
}

/// Start sweeping immediately, then every configured interval.
pub fn spawn(state: SharedState) -> SchedulerHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let period = state.config().scheduler.tick_interval;

    let join = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = period.as_secs(), "tick scheduler started");

        loop {
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {
                    match sweep(&state).await {
                        Ok(report) => info!(
                            ticked = report.ticked,
                            skipped_dead = report.skipped_dead,
                            failed = report.failed,
                            "tick sweep finished"
                        ),
                        Err(err) => warn!(error = %err, "tick sweep skipped"),
                    }
                }
            }
        }
        info!("tick scheduler stopped");
    });

    SchedulerHandle { stop_tx, join }
}

/// Tick every registered pet once. A failure on one pet never aborts the others.
pub async fn sweep(state: &SharedState) -> Result<SweepReport, ServiceError> {
    let store = state.require_store().await?;
    let user_ids = store.list_user_ids().await?;
    let config = &state.config().engine;
    let limit = state.config().scheduler.user_timeout;
    let mut report = SweepReport::default();

    for user_id in user_ids {
        let result = state
            .with_pet_lock_for(&user_id, limit, || async {
                let Some(entity) = store.find_pet(user_id.clone()).await? else {
                    return Ok(PetTick::Missing);
                };
                let pet = Pet::from(entity);
                let Some(outcome) = engine::tick(&pet, now_ms(), config, state.rng()) else {
                    return Ok(PetTick::Dead);
                };
                store.save_pet(outcome.pet.clone().into()).await?;
                Ok(PetTick::Ticked(outcome))
            })
            .await;

        match result {
            Ok(PetTick::Ticked(outcome)) => {
                report.ticked += 1;
                publish_pet(state, &outcome.pet);
                for notice in outcome.notices {
                    debug!(user_id, ?notice, "tick notice");
                    state.notifier().notify(&user_id, notice.message());
                }
            }
            Ok(PetTick::Dead) => report.skipped_dead += 1,
            Ok(PetTick::Missing) => {
                report.failed += 1;
                warn!(user_id, "registered user has no pet record");
            }
            Err(err) => {
                report.failed += 1;
                warn!(user_id, error = %err, "failed to tick pet");
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{ActivityEntity, LeaderboardEntity, PetEntity},
            pet_store::{PetStore, memory::MemoryPetStore},
            storage::{StorageError, StorageResult},
        },
        state::{
            AppState, StateParts, engine::TickNotice, random::ScriptedRandom,
            testing::test_app,
        },
    };

    fn hatchling(user_id: &str) -> PetEntity {
        Pet::hatch(
            user_id.into(),
            now_ms(),
            &Default::default(),
            &ScriptedRandom::never(),
        )
        .into()
    }

    #[tokio::test]
    async fn sweep_ticks_every_pet_and_notifies() {
        let app = test_app(AppConfig::default()).await;
        let mut hungry = hatchling("alice");
        hungry.hunger = 0;
        app.store.save_pet(hungry).await.unwrap();
        app.store.save_pet(hatchling("bob")).await.unwrap();
        let mut updates = app.state.pet_channels().subscribe("alice");

        let report = sweep(&app.state).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                ticked: 2,
                skipped_dead: 0,
                failed: 0
            }
        );

        let alice = app.store.find_pet("alice".into()).await.unwrap().unwrap();
        assert_eq!(alice.care_mistakes, 1);
        assert_eq!(updates.recv().await.unwrap().care_mistakes, 1);
        assert_eq!(
            app.sink.messages_for("alice"),
            [TickNotice::Hungry.message()]
        );
        assert!(app.sink.messages_for("bob").is_empty());
    }

    #[tokio::test]
    async fn dead_pets_are_left_alone() {
        let app = test_app(AppConfig::default()).await;
        let mut dead = hatchling("alice");
        dead.care_mistakes = 10;
        dead.hunger = 0;
        app.store.save_pet(dead.clone()).await.unwrap();

        let report = sweep(&app.state).await.unwrap();
        assert_eq!(report.skipped_dead, 1);
        assert_eq!(
            app.store.find_pet("alice".into()).await.unwrap(),
            Some(dead)
        );
        assert!(app.sink.messages_for("alice").is_empty());
    }

    #[tokio::test]
    async fn sweep_requires_storage() {
        let state = AppState::new(StateParts::new(AppConfig::default()));
        assert!(matches!(sweep(&state).await, Err(ServiceError::Degraded)));
    }

    /// Memory store refusing to save one user's pet and optionally listing
    /// a user without any record.
    struct FlakyStore {
        inner: MemoryPetStore,
        broken_user: &'static str,
        phantom_user: Option<&'static str>,
    }

    impl PetStore for FlakyStore {
        fn find_pet(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<PetEntity>>> {
            self.inner.find_pet(user_id)
        }

        fn save_pet(&self, pet: PetEntity) -> BoxFuture<'static, StorageResult<()>> {
            if pet.user_id == self.broken_user {
                return Box::pin(async {
                    Err(StorageError::unavailable(
                        "disk full".into(),
                        std::io::Error::other("no space left"),
                    ))
                });
            }
            self.inner.save_pet(pet)
        }

        fn list_user_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
            let listed = self.inner.list_user_ids();
            let phantom = self.phantom_user;
            Box::pin(async move {
                let mut user_ids = listed.await?;
                user_ids.extend(phantom.map(str::to_owned));
                Ok(user_ids)
            })
        }

        fn push_activity(&self, entry: ActivityEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.push_activity(entry)
        }

        fn recent_activity(
            &self,
            limit: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<ActivityEntity>>> {
            self.inner.recent_activity(limit)
        }

        fn leaderboard(
            &self,
            limit: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntity>>> {
            self.inner.leaderboard(limit)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    #[tokio::test]
    async fn one_failing_pet_does_not_abort_the_sweep() {
        let app = test_app(AppConfig::default()).await;
        for user in ["alice", "bob", "carol"] {
            app.store.save_pet(hatchling(user)).await.unwrap();
        }
        app.state
            .set_pet_store(Arc::new(FlakyStore {
                inner: app.store.clone(),
                broken_user: "bob",
                phantom_user: None,
            }))
            .await;

        let report = sweep(&app.state).await.unwrap();
        assert_eq!((report.ticked, report.failed), (2, 1));
    }

    #[tokio::test]
    async fn registered_user_without_record_counts_as_failed() {
        let app = test_app(AppConfig::default()).await;
        app.store.save_pet(hatchling("alice")).await.unwrap();
        app.state
            .set_pet_store(Arc::new(FlakyStore {
                inner: app.store.clone(),
                broken_user: "nobody",
                phantom_user: Some("ghost"),
            }))
            .await;

        let report = sweep(&app.state).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                ticked: 1,
                skipped_dead: 0,
                failed: 1
            }
        );
        assert!(app.store.find_pet("ghost".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scheduler_runs_immediately_and_stops() {
        let mut config = AppConfig::default();
        config.scheduler.tick_interval = Duration::from_secs(3600);
        let app = test_app(config).await;
        let mut hungry = hatchling("alice");
        hungry.hunger = 0;
        app.store.save_pet(hungry).await.unwrap();

        let handle = spawn(app.state.clone());
        let mut ticked = false;
        for _ in 0..50 {
            let pet = app.store.find_pet("alice".into()).await.unwrap().unwrap();
            if pet.care_mistakes == 1 {
                ticked = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ticked);

        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_the_handle_ends_the_loop() {
        let mut config = AppConfig::default();
        config.scheduler.tick_interval = Duration::from_secs(3600);
        let app = test_app(config).await;

        let SchedulerHandle { stop_tx, join } = spawn(app.state.clone());
        drop(stop_tx);
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .unwrap()
            .unwrap();
    }
}
