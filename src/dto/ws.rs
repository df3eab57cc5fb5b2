use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::pet::PetView;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from realtime clients.
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to the updates of one pet.
    #[serde(rename_all = "camelCase")]
    Join {
        /// Owner of the pet to follow.
        user_id: String,
    },
    /// Any other message type.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to realtime clients.
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Subscription acknowledged.
    #[serde(rename_all = "camelCase")]
    Joined {
        /// Owner of the followed pet.
        user_id: String,
    },
    /// Latest snapshot of the joined pet.
    PetUpdate {
        /// The snapshot.
        pet: PetView,
    },
    /// Request refused; the connection closes afterwards.
    Error {
        /// Human-readable reason.
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_message_uses_camel_case() {
        let parsed: ClientMessage =
            serde_json::from_str(r#"{"type":"join","userId":"42"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Join { ref user_id } if user_id == "42"));

        let other: ClientMessage = serde_json::from_str(r#"{"type":"dance"}"#).unwrap();
        assert!(matches!(other, ClientMessage::Unknown));

        let joined = serde_json::to_string(&ServerMessage::Joined {
            user_id: "42".into(),
        })
        .unwrap();
        assert_eq!(joined, r#"{"type":"joined","userId":"42"}"#);
    }
}
