//! Process-local pet store, used when no database is configured and by tests.

use std::{collections::VecDeque, sync::Arc};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use super::{ACTIVITY_LOG_CAPACITY, PetStore, rank_leaderboard};
use crate::dao::{
    models::{ActivityEntity, LeaderboardEntity, PetEntity},
    storage::StorageResult,
};

/// Process-local [`PetStore`](super::PetStore); clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryPetStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    pets: DashMap<String, PetEntity>,
    activity: Mutex<VecDeque<ActivityEntity>>,
}

impl MemoryPetStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PetStore for MemoryPetStore {
    fn find_pet(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<PetEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.pets.get(&user_id).map(|entry| entry.clone())) })
    }

    fn save_pet(&self, pet: PetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.pets.insert(pet.user_id.clone(), pet);
            Ok(())
        })
    }

    fn list_user_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut ids: Vec<String> = inner.pets.iter().map(|entry| entry.key().clone()).collect();
            ids.sort();
            Ok(ids)
        })
    }

    fn push_activity(&self, entry: ActivityEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut log = inner.activity.lock().await;
            log.push_front(entry);
            log.truncate(ACTIVITY_LOG_CAPACITY);
            Ok(())
        })
    }

    fn recent_activity(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ActivityEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let log = inner.activity.lock().await;
            Ok(log.iter().take(limit).cloned().collect())
        })
    }

    fn leaderboard(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let rows = inner
                .pets
                .iter()
                .map(|entry| LeaderboardEntity::from(entry.value()))
                .collect();
            Ok(rank_leaderboard(rows, limit))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: &str, timestamp: i64) -> ActivityEntity {
        ActivityEntity {
            user_id: user_id.into(),
            action: "feed".into(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn activity_log_keeps_the_newest_entries() {
        let store = MemoryPetStore::new();
        for ts in 0..60 {
            store.push_activity(entry("alice", ts)).await.unwrap();
        }

        let all = store.recent_activity(100).await.unwrap();
        assert_eq!(all.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(all.first().map(|e| e.timestamp), Some(59));
        assert_eq!(all.last().map(|e| e.timestamp), Some(10));

        let few = store.recent_activity(3).await.unwrap();
        let stamps: Vec<_> = few.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, [59, 58, 57]);
    }
}
