use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{ActivityEntity, PetEntity};

pub const PET_PREFIX: &str = "pet::";
pub const ACTIVITY_DOC_ID: &str = "activity::log";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchPetDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub pet: PetEntity,
}

impl From<(PetEntity, Option<String>)> for CouchPetDocument {
    fn from((pet, rev): (PetEntity, Option<String>)) -> Self {
        Self {
            id: pet_doc_id(&pet.user_id),
            rev,
            pet,
        }
    }
}

/// Single document holding the activity ring, newest entry first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouchActivityDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default)]
    pub entries: Vec<ActivityEntity>,
}

impl CouchActivityDocument {
    pub fn empty() -> Self {
        Self {
            id: ACTIVITY_DOC_ID.to_owned(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, entry: ActivityEntity, capacity: usize) {
        self.entries.insert(0, entry);
        self.entries.truncate(capacity);
    }
}

pub fn pet_doc_id(user_id: &str) -> String {
    format!("{PET_PREFIX}{user_id}")
}

pub fn user_id_from_doc_id(doc_id: &str) -> Option<&str> {
    doc_id.strip_prefix(PET_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pet_document_ids_round_trip_user_ids() {
        let id = pet_doc_id("tg:42");
        assert_eq!(id, "pet::tg:42");
        assert_eq!(user_id_from_doc_id(&id), Some("tg:42"));
        assert_eq!(user_id_from_doc_id(ACTIVITY_DOC_ID), None);
    }

    #[test]
    fn activity_document_is_a_bounded_ring() {
        let mut doc = CouchActivityDocument::empty();
        for timestamp in 0..5 {
            doc.push(
                ActivityEntity {
                    user_id: "alice".into(),
                    action: "clean".into(),
                    timestamp,
                },
                3,
            );
        }
        let stamps: Vec<_> = doc.entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, [4, 3, 2]);
    }
}
