use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{ActivityEntity, LeaderboardEntity, PetEntity};

/// Pet document stored in the `pets` collection, keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPetDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub pet: PetEntity,
}

impl From<PetEntity> for MongoPetDocument {
    fn from(pet: PetEntity) -> Self {
        Self {
            id: pet.user_id.clone(),
            pet,
        }
    }
}

/// Entry of the capped `activity` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoActivityDocument {
    pub user_id: String,
    pub action: String,
    pub timestamp: i64,
}

impl From<ActivityEntity> for MongoActivityDocument {
    fn from(value: ActivityEntity) -> Self {
        Self {
            user_id: value.user_id,
            action: value.action,
            timestamp: value.timestamp,
        }
    }
}

impl From<MongoActivityDocument> for ActivityEntity {
    fn from(value: MongoActivityDocument) -> Self {
        Self {
            user_id: value.user_id,
            action: value.action,
            timestamp: value.timestamp,
        }
    }
}

/// Projection of a pet document used by the leaderboard query.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoLeaderboardRow {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub coins: u32,
    pub age: u32,
}

impl From<MongoLeaderboardRow> for LeaderboardEntity {
    fn from(value: MongoLeaderboardRow) -> Self {
        Self {
            user_id: value.user_id,
            coins: value.coins,
            age: value.age,
        }
    }
}

pub fn doc_id(user_id: &str) -> Document {
    doc! { "_id": user_id }
}
