//! Side effects following a persisted pet change: realtime push and activity log.

use tracing::{debug, warn};

use crate::{
    dao::{models::ActivityEntity, pet_store::PetStore},
    dto::{activity::ActivityEntry, pet::PetView, sse::ServerEvent},
    state::{SharedState, pet::Pet},
};

/// SSE event name of activity entries.
pub const ACTIVITY_EVENT: &str = "activity";
/// SSE event name of pet snapshots.
pub const PET_UPDATE_EVENT: &str = "petUpdate";

/// Push the latest snapshot of `pet` to its owner's subscribers.
pub fn publish_pet(state: &SharedState, pet: &Pet) {
    let delivered = state.pet_channels().publish(PetView::from(pet));
    debug!(user_id = %pet.user_id, delivered, "pet update published");
}

/// Append a successful action to the activity log and the public feed.
///
/// The pet is already saved at this point, so a failed log write is only reported.
pub async fn record_activity(
    state: &SharedState,
    store: &dyn PetStore,
    user_id: &str,
    action: &str,
    timestamp: i64,
) {
    let entry = ActivityEntity {
        user_id: user_id.to_owned(),
        action: action.to_owned(),
        timestamp,
    };

    if let Err(err) = store.push_activity(entry.clone()).await {
        warn!(user_id, action, error = %err, "failed to append activity");
        return;
    }

    match ServerEvent::json(ACTIVITY_EVENT.to_string(), &ActivityEntry::from(entry)) {
        Ok(event) => state.activity_sse().broadcast(event),
        Err(err) => warn!(error = %err, "failed to serialize activity event"),
    }
}
