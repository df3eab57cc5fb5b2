//! Per-user publish/subscribe channels carrying pet snapshots.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::pet::PetView;

const CHANNEL_CAPACITY: usize = 16;

/// Channels keyed by user id, created on first subscription.
///
/// Delivery is best-effort: a publish with no live subscriber is dropped,
/// and lagging subscribers skip stale snapshots.
#[derive(Default)]
pub struct PetChannels {
    senders: DashMap<String, broadcast::Sender<PetView>>,
}

impl PetChannels {
    /// No channel yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive the snapshots published for `user_id`, creating its channel if needed.
    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<PetView> {
        self.senders
            .entry(user_id.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Push `pet` to the subscribers of its owner. Returns the number of receivers reached.
    pub fn publish(&self, pet: PetView) -> usize {
        let user_id = pet.user_id.clone();
        let delivered = match self.senders.get(&user_id) {
            Some(sender) => sender.send(pet).unwrap_or(0),
            None => return 0,
        };
        if delivered == 0 {
            self.release(&user_id);
        }
        delivered
    }

    /// Drop the channel of `user_id` once nobody listens anymore.
    pub fn release(&self, user_id: &str) {
        self.senders
            .remove_if(user_id, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of users with at least one channel open.
    pub fn active_channels(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{pet::Pet, random::ScriptedRandom};

    fn view(user_id: &str) -> PetView {
        let pet = Pet::hatch(
            user_id.into(),
            0,
            &Default::default(),
            &ScriptedRandom::never(),
        );
        PetView::from(&pet)
    }

    #[tokio::test]
    async fn updates_reach_only_the_owner_channel() {
        let channels = PetChannels::new();
        let mut alice = channels.subscribe("alice");
        let mut bob = channels.subscribe("bob");

        assert_eq!(channels.publish(view("alice")), 1);

        assert_eq!(alice.recv().await.unwrap().user_id, "alice");
        assert!(bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn channel_is_dropped_with_its_last_subscriber() {
        let channels = PetChannels::new();
        let receiver = channels.subscribe("alice");
        assert_eq!(channels.active_channels(), 1);

        channels.release("alice");
        assert_eq!(channels.active_channels(), 1);

        drop(receiver);
        assert_eq!(channels.publish(view("alice")), 0);
        assert_eq!(channels.active_channels(), 0);
        assert_eq!(channels.publish(view("nobody")), 0);
    }
}
