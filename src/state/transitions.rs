//! Per-user serialization of read-modify-write cycles on pets.

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::{sync::Mutex, time::timeout};
use tracing::warn;

use crate::error::ServiceError;

/// One async mutex per user id; holders own the right to load, change and
/// save that user's pet.
///
/// Entries only live while some caller holds or waits for them.
#[derive(Default)]
pub struct PetLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PetLocks {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of user ids currently locked or awaited.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the mutex of `user_id` once the table holds the only handle.
    fn release(&self, user_id: &str) {
        self.locks
            .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Run `work` while holding the lock of `user_id`. Waiting for the lock
    /// counts against `limit`.
    pub async fn run<F, Fut, T>(
        &self,
        user_id: &str,
        limit: Duration,
        work: F,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let lock = self.lock_for(user_id);
        let guarded = async move {
            let _guard = lock.lock().await;
            work().await
        };

        let outcome = timeout(limit, guarded).await;
        self.release(user_id);

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(user_id, timeout_ms = limit.as_millis() as u64, "pet operation timed out");
                Err(ServiceError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::sleep;

    use super::*;

    #[tokio::test]
    async fn same_user_work_is_serialized() {
        let locks = Arc::new(PetLocks::new());
        let inside = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                tokio::spawn(async move {
                    locks
                        .run("alice", Duration::from_secs(5), || async {
                            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                            sleep(Duration::from_millis(5)).await;
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(locks.active_locks(), 0);
    }

    #[tokio::test]
    async fn finished_work_leaves_no_entry_behind() {
        let locks = PetLocks::new();
        for n in 0..100 {
            let result: Result<(), _> = locks
                .run(&format!("ghost{n}"), Duration::from_secs(1), || async {
                    Err(ServiceError::NotFound("no pet".into()))
                })
                .await;
            assert!(matches!(result, Err(ServiceError::NotFound(_))));
        }
        assert_eq!(locks.active_locks(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_another_caller_waits() {
        let locks = Arc::new(PetLocks::new());
        let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();
        let (finish_tx, finish_rx) = tokio::sync::oneshot::channel::<()>();

        let holder = {
            let locks = locks.clone();
            tokio::spawn(async move {
                locks
                    .run("alice", Duration::from_secs(5), || async move {
                        let _ = entered_tx.send(());
                        let _ = finish_rx.await;
                        Ok(())
                    })
                    .await
            })
        };
        entered_rx.await.unwrap();
        assert_eq!(locks.active_locks(), 1);

        finish_tx.send(()).unwrap();
        holder.await.unwrap().unwrap();
        assert_eq!(locks.active_locks(), 0);
    }

    #[tokio::test]
    async fn slow_work_times_out() {
        let locks = PetLocks::new();
        let result = locks
            .run("alice", Duration::from_millis(10), || async {
                sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));

        // The lock is released once the timed-out work is dropped.
        let result = locks
            .run("alice", Duration::from_millis(100), || async { Ok(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(locks.active_locks(), 0);
    }
}
