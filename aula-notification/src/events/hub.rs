// Per-subscriber fan-out hubs.
//
// Two instances of the same machinery back the real-time side of the
// service: the delivery hub pushes full `Notification` bodies to every
// surface currently streaming for a subscriber, and the invalidation bus
// carries a content-free "recheck your cache" signal after a successful
// mutation. Each subscriber id gets its own broadcast channel, so surfaces
// for different subscribers never cross-notify.
//
// Both hubs are best-effort hints: nothing is persisted, a publish with no
// listeners is a no-op, and correctness always falls back to pull-based
// reconciliation against the store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::Notification;

const CHANNEL_CAPACITY: usize = 64;

/// Content-free mutation signal: "something in your feed changed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invalidation;

pub type DeliveryHub = SubscriberHub<Notification>;
pub type InvalidationBus = SubscriberHub<Invalidation>;

/// One broadcast channel per subscriber id, created on first use and
/// dropped once the last receiver is gone.
pub struct SubscriberHub<T> {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<T>>>>,
}

impl<T> Clone for SubscriberHub<T> {
    fn clone(&self) -> Self {
        Self {
            channels: self.channels.clone(),
        }
    }
}

impl<T: Clone> Default for SubscriberHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SubscriberHub<T> {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open a subscription for one surface. Every concurrently open
    /// receiver for the same subscriber sees every event published after
    /// its creation; nothing is replayed.
    pub fn subscribe(&self, subscriber_id: Uuid) -> broadcast::Receiver<T> {
        let mut channels = self.channels.write().expect("hub lock poisoned");
        channels
            .entry(subscriber_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Fire-and-forget publish. Never blocks; a subscriber with no open
    /// surfaces simply misses the hint and reconciles on its next fetch.
    pub fn publish(&self, subscriber_id: Uuid, event: T) {
        let stale = {
            let channels = self.channels.read().expect("hub lock poisoned");
            match channels.get(&subscriber_id) {
                Some(tx) => tx.send(event).is_err(),
                None => false,
            }
        };

        // All receivers went away; drop the channel so the map does not
        // accumulate one entry per subscriber that ever connected.
        if stale {
            let mut channels = self.channels.write().expect("hub lock poisoned");
            if let Some(tx) = channels.get(&subscriber_id) {
                if tx.receiver_count() == 0 {
                    channels.remove(&subscriber_id);
                }
            }
        }
    }

    /// Number of live receivers for a subscriber (all surfaces, all tabs).
    pub fn receiver_count(&self, subscriber_id: Uuid) -> usize {
        self.channels
            .read()
            .expect("hub lock poisoned")
            .get(&subscriber_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_open_subscription_receives_the_event() {
        let hub: SubscriberHub<Invalidation> = SubscriberHub::new();
        let sub = Uuid::new_v4();

        let mut rx_a = hub.subscribe(sub);
        let mut rx_b = hub.subscribe(sub);

        hub.publish(sub, Invalidation);

        assert_eq!(rx_a.recv().await.unwrap(), Invalidation);
        assert_eq!(rx_b.recv().await.unwrap(), Invalidation);
    }

    #[tokio::test]
    async fn subscribers_never_cross_notify() {
        let hub: SubscriberHub<Invalidation> = SubscriberHub::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut rx_alice = hub.subscribe(alice);
        let mut rx_bob = hub.subscribe(bob);

        hub.publish(alice, Invalidation);

        assert!(rx_alice.recv().await.is_ok());
        assert!(matches!(
            rx_bob.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn publish_without_listeners_is_a_noop() {
        let hub: SubscriberHub<Invalidation> = SubscriberHub::new();
        let sub = Uuid::new_v4();

        // No panic, no error surfaced.
        hub.publish(sub, Invalidation);
        assert_eq!(hub.receiver_count(sub), 0);
    }

    #[tokio::test]
    async fn channel_is_dropped_after_last_receiver_disconnects() {
        let hub: SubscriberHub<Invalidation> = SubscriberHub::new();
        let sub = Uuid::new_v4();

        let rx = hub.subscribe(sub);
        assert_eq!(hub.receiver_count(sub), 1);
        drop(rx);

        hub.publish(sub, Invalidation);
        assert_eq!(hub.receiver_count(sub), 0);
        assert!(hub
            .channels
            .read()
            .unwrap()
            .get(&sub)
            .is_none());
    }

    #[tokio::test]
    async fn no_replay_for_late_subscribers() {
        let hub: SubscriberHub<Invalidation> = SubscriberHub::new();
        let sub = Uuid::new_v4();

        let _keepalive = hub.subscribe(sub);
        hub.publish(sub, Invalidation);

        let mut late = hub.subscribe(sub);
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
