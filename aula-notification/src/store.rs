use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use uuid::Uuid;

use aula_shared::errors::{AppError, AppResult, ErrorCode};
use aula_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{NewNotification, Notification};

/// One subscriber's notification feed, newest first.
///
/// `items` is kept sorted by `created_at` desc with `id` desc as tie-break.
/// `deleted` remembers removed ids so a retried delete succeeds without the
/// id ever reappearing.
#[derive(Default)]
struct Feed {
    items: Vec<Notification>,
    deleted: HashSet<Uuid>,
}

impl Feed {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|n| n.id == id)
    }
}

/// Result of a mark-as-read call. `changed` is false when the notification
/// was already read, so callers can skip invalidation fan-out for no-ops.
#[derive(Debug, Clone)]
pub struct MarkOutcome {
    pub notification: Notification,
    pub changed: bool,
}

/// Authoritative in-memory notification store.
///
/// Each subscriber's feed sits behind its own mutex: operations on one
/// subscriber are linearizable with respect to each other, and operations
/// on different subscribers never contend. The outer map lock is held only
/// long enough to look up or create a feed handle.
#[derive(Clone, Default)]
pub struct NotificationStore {
    feeds: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Feed>>>>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn feed(&self, subscriber_id: Uuid) -> Arc<Mutex<Feed>> {
        if let Some(feed) = self
            .feeds
            .read()
            .expect("feed map lock poisoned")
            .get(&subscriber_id)
        {
            return feed.clone();
        }

        self.feeds
            .write()
            .expect("feed map lock poisoned")
            .entry(subscriber_id)
            .or_default()
            .clone()
    }

    fn existing_feed(&self, subscriber_id: Uuid) -> Option<Arc<Mutex<Feed>>> {
        self.feeds
            .read()
            .expect("feed map lock poisoned")
            .get(&subscriber_id)
            .cloned()
    }

    /// Append a new notification, assigning `id` and `created_at`
    /// server-side. Always succeeds for a valid subscriber.
    pub fn append(&self, subscriber_id: Uuid, new: NewNotification) -> Notification {
        let feed = self.feed(subscriber_id);
        let mut feed = feed.lock().expect("feed lock poisoned");

        // Keep created_at monotonically non-decreasing per subscriber even
        // if the wall clock steps backwards.
        let mut created_at = Utc::now();
        if let Some(head) = feed.items.first() {
            created_at = created_at.max(head.created_at);
        }

        // now_v7 goes through uuid's shared thread-safe context, so ids
        // created in the same millisecond still order by creation.
        let notification = Notification {
            id: Uuid::now_v7(),
            subscriber_id,
            kind: new.kind,
            title: new.title,
            body: new.body,
            payload: new.payload,
            created_at,
            read_at: None,
        };

        // Front insert, except when an equal-timestamp run at the head has
        // ids sorting above the new one.
        let pos = feed
            .items
            .iter()
            .take_while(|n| n.created_at == created_at && n.id > notification.id)
            .count();
        feed.items.insert(pos, notification.clone());

        tracing::debug!(
            notification_id = %notification.id,
            subscriber_id = %subscriber_id,
            kind = %notification.kind,
            "notification appended"
        );

        notification
    }

    /// Read one page of the subscriber's feed, newest first.
    ///
    /// `total` and the items come from the same lock acquisition, so the
    /// envelope is a consistent snapshot. A page beyond the end yields a
    /// well-formed envelope with empty items and accurate totals.
    pub fn page(&self, subscriber_id: Uuid, params: &PaginationParams) -> Paginated<Notification> {
        let Some(feed) = self.existing_feed(subscriber_id) else {
            return Paginated::new(Vec::new(), 0, params);
        };
        let feed = feed.lock().expect("feed lock poisoned");

        let total = feed.items.len() as u64;
        let offset = params.offset() as usize;
        let limit = params.limit() as usize;

        let items: Vec<Notification> = feed
            .items
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Paginated::new(items, total, params)
    }

    /// Mark a single notification read. Idempotent on an already-read
    /// notification; `NotificationNotFound` if the id does not belong to
    /// this subscriber (including previously deleted ids).
    pub fn mark_read(&self, subscriber_id: Uuid, id: Uuid) -> AppResult<MarkOutcome> {
        let feed = self
            .existing_feed(subscriber_id)
            .ok_or_else(not_found)?;
        let mut feed = feed.lock().expect("feed lock poisoned");

        let idx = feed.position(id).ok_or_else(not_found)?;
        let item = &mut feed.items[idx];

        let changed = item.read_at.is_none();
        if changed {
            item.read_at = Some(Utc::now());
        }

        Ok(MarkOutcome {
            notification: item.clone(),
            changed,
        })
    }

    /// Mark every currently-unread notification read in one logical
    /// operation; returns how many transitioned. An `append` serialized
    /// after this call leaves the new notification unread.
    pub fn mark_all_read(&self, subscriber_id: Uuid) -> usize {
        let Some(feed) = self.existing_feed(subscriber_id) else {
            return 0;
        };
        let mut feed = feed.lock().expect("feed lock poisoned");

        let now = Utc::now();
        let mut updated = 0;
        for item in feed.items.iter_mut().filter(|n| n.read_at.is_none()) {
            item.read_at = Some(now);
            updated += 1;
        }

        updated
    }

    /// Remove a notification. Returns true if state changed; a repeat
    /// delete of an already-removed id succeeds with no effect, and an id
    /// that never belonged to this subscriber is `NotificationNotFound`.
    pub fn delete(&self, subscriber_id: Uuid, id: Uuid) -> AppResult<bool> {
        let feed = self
            .existing_feed(subscriber_id)
            .ok_or_else(not_found)?;
        let mut feed = feed.lock().expect("feed lock poisoned");

        if let Some(idx) = feed.position(id) {
            feed.items.remove(idx);
            feed.deleted.insert(id);
            return Ok(true);
        }

        if feed.deleted.contains(&id) {
            return Ok(false);
        }

        Err(not_found())
    }

    /// Count of notifications with no `read_at`. Recomputed under the feed
    /// lock, so it can never drift from what `page` reports at the same
    /// instant.
    pub fn unread_count(&self, subscriber_id: Uuid) -> u64 {
        let Some(feed) = self.existing_feed(subscriber_id) else {
            return 0;
        };
        let feed = feed.lock().expect("feed lock poisoned");
        feed.items.iter().filter(|n| n.read_at.is_none()).count() as u64
    }
}

fn not_found() -> AppError {
    AppError::new(ErrorCode::NotificationNotFound, "notification not found")
}
