use serde::{Deserialize, Serialize};

/// Persisted representation of a pet, one record per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PetEntity {
    /// Owner identifier, primary key of the record.
    pub user_id: String,
    /// Fullness.
    pub hunger: u32,
    /// Mood.
    pub happiness: u32,
    /// Body weight.
    pub weight: u32,
    /// Days lived.
    pub age: u32,
    /// Droppings waiting to be cleaned.
    pub poop: u32,
    /// Neglect counter.
    pub care_mistakes: u32,
    /// Inside the sleep window.
    pub is_sleeping: bool,
    /// Needs medicine.
    pub is_sick: bool,
    /// Room light state.
    pub is_light_on: bool,
    /// Spendable balance.
    pub coins: u32,
    /// Local hour of day in `[0, 24)`.
    pub clock_time: f64,
    /// Clock aligned with the owner's local time.
    pub time_set: bool,
    /// Epoch milliseconds.
    pub last_update_time: i64,
    /// Epoch milliseconds.
    pub last_video_watch_time: i64,
    /// Epoch milliseconds.
    #[serde(default)]
    pub last_coin_drop: i64,
    /// Successful referrals.
    #[serde(default)]
    pub referral_count: u32,
    /// Cosmetic sprite hue.
    #[serde(default)]
    pub tamahue: i32,
    /// Premium currency.
    #[serde(default)]
    pub crowns: u32,
    /// Epoch milliseconds; stats do not decay before it.
    #[serde(default)]
    pub decay_shield_until: i64,
    /// Epoch milliseconds; no random sickness before it.
    #[serde(default)]
    pub sickness_shield_until: i64,
    /// Rice meals grant the cookbook bonus.
    #[serde(default)]
    pub has_cookbook: bool,
}

/// Entry of the bounded activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEntity {
    /// User that performed the action.
    pub user_id: String,
    /// Action name, e.g. `feed` or `hatched`.
    pub action: String,
    /// Epoch milliseconds at which the action succeeded.
    pub timestamp: i64,
}

/// Projection of a pet used to rank users by wealth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntity {
    /// Owner of the pet.
    pub user_id: String,
    /// Current balance.
    pub coins: u32,
    /// Days lived, used to break ties.
    pub age: u32,
}

impl From<&PetEntity> for LeaderboardEntity {
    fn from(value: &PetEntity) -> Self {
        Self {
            user_id: value.user_id.clone(),
            coins: value.coins,
            age: value.age,
        }
    }
}
