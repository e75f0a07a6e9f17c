use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single notification owned by one subscriber.
///
/// `read_at` is the only mutable field: it transitions `None -> Some(ts)`
/// exactly once and is never reversed. Everything else is immutable after
/// creation; `id` and `created_at` are assigned by the store, never by
/// callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Producer-supplied fields of a notification-to-be.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: String,
    pub title: String,
    pub body: String,
    pub payload: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(kind: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            body: body.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}
