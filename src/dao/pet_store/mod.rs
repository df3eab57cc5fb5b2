/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::models::{ActivityEntity, LeaderboardEntity, PetEntity};
use crate::dao::storage::StorageResult;

/// Number of activity entries retained by every backend.
pub const ACTIVITY_LOG_CAPACITY: usize = 50;

/// Abstraction over the persistence layer for pets, the user registry, the
/// activity log and the leaderboard.
pub trait PetStore: Send + Sync {
    /// Load the pet owned by `user_id`.
    fn find_pet(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<PetEntity>>>;
    /// Upsert a whole pet record and register its owner.
    fn save_pet(&self, pet: PetEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Every user owning a pet.
    fn list_user_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>>;
    /// Append an activity entry, dropping the oldest beyond [`ACTIVITY_LOG_CAPACITY`].
    fn push_activity(&self, entry: ActivityEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Most recent activity entries, newest first.
    fn recent_activity(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ActivityEntity>>>;
    /// Richest users, sorted by coins descending then user id.
    fn leaderboard(&self, limit: usize)
    -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Sort leaderboard rows by coins descending (ties by user id) and keep the top `limit`.
pub fn rank_leaderboard(
    mut rows: Vec<LeaderboardEntity>,
    limit: usize,
) -> Vec<LeaderboardEntity> {
    rows.sort_by(|a, b| {
        b.coins
            .cmp(&a.coins)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    rows.truncate(limit);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: &str, coins: u32) -> LeaderboardEntity {
        LeaderboardEntity {
            user_id: user_id.into(),
            coins,
            age: 1,
        }
    }

    #[test]
    fn leaderboard_ranks_by_coins_then_user() {
        let ranked = rank_leaderboard(
            vec![row("carol", 3), row("bob", 10), row("alice", 3), row("dave", 0)],
            3,
        );
        let order: Vec<_> = ranked.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(order, ["bob", "alice", "carol"]);
    }
}
