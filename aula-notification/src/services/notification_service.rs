use uuid::Uuid;

use aula_shared::errors::AppResult;
use aula_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::{DeliveryHub, Invalidation, InvalidationBus};
use crate::models::{NewNotification, Notification};
use crate::store::NotificationStore;

/// Service facade over the store plus both fan-out hubs.
///
/// Creation goes store-first, then best-effort delivery push. Mutations go
/// store-first, then emit one invalidation signal per successful state
/// change; failures and no-effect repeats emit nothing, so surfaces only
/// re-fetch when the store actually moved.
#[derive(Clone)]
pub struct NotificationService {
    store: NotificationStore,
    delivery: DeliveryHub,
    invalidations: InvalidationBus,
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationService {
    pub fn new() -> Self {
        Self {
            store: NotificationStore::new(),
            delivery: DeliveryHub::new(),
            invalidations: InvalidationBus::new(),
        }
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub fn delivery(&self) -> &DeliveryHub {
        &self.delivery
    }

    pub fn invalidations(&self) -> &InvalidationBus {
        &self.invalidations
    }

    /// Create a notification for a subscriber and push it to any currently
    /// connected surface. The push is a hint: it never blocks and its
    /// outcome never affects the append.
    pub fn create(&self, subscriber_id: Uuid, new: NewNotification) -> Notification {
        let notification = self.store.append(subscriber_id, new);

        self.delivery.publish(subscriber_id, notification.clone());

        tracing::debug!(
            notification_id = %notification.id,
            subscriber_id = %subscriber_id,
            kind = %notification.kind,
            "notification created"
        );

        notification
    }

    /// One page of the subscriber's feed, newest first.
    pub fn list(&self, subscriber_id: Uuid, params: &PaginationParams) -> Paginated<Notification> {
        self.store.page(subscriber_id, params)
    }

    pub fn unread_count(&self, subscriber_id: Uuid) -> u64 {
        self.store.unread_count(subscriber_id)
    }

    /// Mark one notification read. Emits an invalidation signal only when
    /// the read state actually transitioned.
    pub fn mark_read(&self, subscriber_id: Uuid, id: Uuid) -> AppResult<Notification> {
        let outcome = self.store.mark_read(subscriber_id, id)?;

        if outcome.changed {
            self.invalidations.publish(subscriber_id, Invalidation);
        }

        Ok(outcome.notification)
    }

    /// Mark every unread notification read; returns how many transitioned.
    pub fn mark_all_read(&self, subscriber_id: Uuid) -> usize {
        let updated = self.store.mark_all_read(subscriber_id);

        if updated > 0 {
            self.invalidations.publish(subscriber_id, Invalidation);
        }

        updated
    }

    /// Delete a notification. A retried delete of an already-removed id is
    /// success with no effect and no signal.
    pub fn delete(&self, subscriber_id: Uuid, id: Uuid) -> AppResult<()> {
        let changed = self.store.delete(subscriber_id, id)?;

        if changed {
            self.invalidations.publish(subscriber_id, Invalidation);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn new(kind: &str) -> NewNotification {
        NewNotification::new(kind, "title", "body")
    }

    #[tokio::test]
    async fn create_pushes_the_full_notification() {
        let service = NotificationService::new();
        let sub = Uuid::new_v4();
        let mut rx = service.delivery().subscribe(sub);

        let created = service.create(sub, new("assignment"));

        let pushed = rx.recv().await.unwrap();
        assert_eq!(pushed.id, created.id);
        assert_eq!(pushed.title, "title");
        assert!(pushed.read_at.is_none());
    }

    #[tokio::test]
    async fn successful_mutations_emit_exactly_one_invalidation() {
        let service = NotificationService::new();
        let sub = Uuid::new_v4();
        let n = service.create(sub, new("grade"));
        let mut rx = service.invalidations().subscribe(sub);

        service.mark_read(sub, n.id).unwrap();
        assert!(rx.try_recv().is_ok());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // Already read: no state change, no signal.
        service.mark_read(sub, n.id).unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        service.delete(sub, n.id).unwrap();
        assert!(rx.try_recv().is_ok());

        // Retried delete: success, no signal.
        service.delete(sub, n.id).unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn failed_mutations_emit_nothing() {
        let service = NotificationService::new();
        let sub = Uuid::new_v4();
        service.create(sub, new("system"));
        let mut rx = service.invalidations().subscribe(sub);

        assert!(service.mark_read(sub, Uuid::new_v4()).is_err());
        assert!(service.delete(sub, Uuid::new_v4()).is_err());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn mark_all_read_signals_only_when_something_changed() {
        let service = NotificationService::new();
        let sub = Uuid::new_v4();
        for _ in 0..5 {
            service.create(sub, new("announcement"));
        }
        let mut rx = service.invalidations().subscribe(sub);

        assert_eq!(service.mark_all_read(sub), 5);
        assert!(rx.try_recv().is_ok());

        assert_eq!(service.mark_all_read(sub), 0);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn mutations_on_one_subscriber_do_not_signal_another() {
        let service = NotificationService::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let n = service.create(alice, new("assignment"));
        service.create(bob, new("assignment"));

        let mut rx_bob = service.invalidations().subscribe(bob);
        service.mark_read(alice, n.id).unwrap();

        assert!(matches!(rx_bob.try_recv(), Err(TryRecvError::Empty)));
    }
}
