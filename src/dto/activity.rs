use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::dao::models::{ActivityEntity, LeaderboardEntity};

use super::format_epoch_ms;

/// Default number of leaderboard rows.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Entry of the public activity feed.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// User that performed the action.
    pub user_id: String,
    /// Action name.
    pub action: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Same instant as RFC 3339.
    pub at: String,
}

impl From<ActivityEntity> for ActivityEntry {
    fn from(value: ActivityEntity) -> Self {
        Self {
            at: format_epoch_ms(value.timestamp),
            user_id: value.user_id,
            action: value.action,
            timestamp: value.timestamp,
        }
    }
}

/// Row of the coin leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Owner of the pet.
    pub user_id: String,
    /// Current balance.
    pub coins: u32,
    /// Days lived.
    pub age: u32,
}

impl From<LeaderboardEntity> for LeaderboardEntry {
    fn from(value: LeaderboardEntity) -> Self {
        Self {
            user_id: value.user_id,
            coins: value.coins,
            age: value.age,
        }
    }
}

/// Query string of `GET /leaderboard`.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// Number of rows, between 1 and 100 (default 10).
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

impl LeaderboardQuery {
    /// Requested row count, or the default.
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_entry_carries_rfc3339_time() {
        let entry = ActivityEntry::from(ActivityEntity {
            user_id: "42".into(),
            action: "feed".into(),
            timestamp: 0,
        });
        assert_eq!(entry.at, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn leaderboard_limit_bounds() {
        assert_eq!(LeaderboardQuery::default().limit(), DEFAULT_LEADERBOARD_LIMIT);
        assert!(LeaderboardQuery { limit: Some(0) }.validate().is_err());
        assert!(LeaderboardQuery { limit: Some(101) }.validate().is_err());
        assert!(LeaderboardQuery { limit: Some(100) }.validate().is_ok());
    }
}
