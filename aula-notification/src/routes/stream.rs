// GET /notifications/stream
//
// SSE feed for the authenticated subscriber. Two event types:
//
//   event: notification.created      data: full Notification JSON
//   event: notification.invalidated  data: {}
//
// The stream is a best-effort hint channel: nothing is replayed after a
// reconnect, and a lagged receiver is folded into a single
// `notification.invalidated` frame so the surface re-fetches instead of
// trusting a gapped stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use aula_shared::errors::AppError;
use aula_shared::types::auth::AuthUser;

use crate::ApiState;

pub const EVENT_CREATED: &str = "notification.created";
pub const EVENT_INVALIDATED: &str = "notification.invalidated";

pub async fn notification_stream(
    State(state): State<Arc<ApiState>>,
    auth_user: AuthUser,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    let subscriber_id = auth_user.id;
    let mut delivery_rx = state.service.delivery().subscribe(subscriber_id);
    let mut invalidation_rx = state.service.invalidations().subscribe(subscriber_id);

    info!(subscriber_id = %subscriber_id, "SSE surface connected");

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                delivery = delivery_rx.recv() => match delivery {
                    Ok(notification) => {
                        let json = match serde_json::to_string(&notification) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("SSE: failed to serialize notification: {e}");
                                continue;
                            }
                        };
                        yield Ok(SseEvent::default()
                            .event(EVENT_CREATED)
                            .id(notification.id.to_string())
                            .data(json));
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(subscriber_id = %subscriber_id, skipped = n, "SSE surface lagged");
                        yield Ok(invalidated_frame());
                    }
                    Err(RecvError::Closed) => {
                        debug!(subscriber_id = %subscriber_id, "delivery channel closed, ending stream");
                        break;
                    }
                },
                signal = invalidation_rx.recv() => match signal {
                    Ok(_) => {
                        yield Ok(invalidated_frame());
                    }
                    Err(RecvError::Lagged(_)) => {
                        // The signal carries no payload; one frame covers
                        // however many were missed.
                        yield Ok(invalidated_frame());
                    }
                    Err(RecvError::Closed) => {
                        debug!(subscriber_id = %subscriber_id, "invalidation channel closed, ending stream");
                        break;
                    }
                },
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

fn invalidated_frame() -> SseEvent {
    SseEvent::default().event(EVENT_INVALIDATED).data("{}")
}
