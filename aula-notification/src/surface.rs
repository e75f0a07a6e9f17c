// Client-side reconciliation protocol.
//
// Every independently rendered view of a subscriber's notifications (badge
// counter, dropdown preview, full list) drives one `Surface` through the
// same state machine:
//
//   Uninitialized -> Loading -> Synced -> Stale -> Loading -> Synced ...
//
// A fetch result always replaces the local cache wholesale, so the cache
// only ever equals a single consistent store snapshot. Push events and
// invalidation signals are hints that mark the surface stale; a pushed
// notification may be rendered optimistically, but the authoritative
// re-fetch still happens. Fetch completions carry a generation tag so a
// result that arrives after deactivation or after a newer fetch started is
// discarded instead of written into a stale context.

use aula_shared::types::pagination::Paginated;

use crate::models::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Loading,
    Synced,
    Stale,
}

/// The snapshot a surface caches: one page plus the badge count.
#[derive(Debug, Clone)]
pub struct SurfaceSnapshot {
    pub page: Paginated<Notification>,
    pub unread: u64,
}

/// Token tying a fetch completion to the fetch that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug)]
pub struct Surface {
    state: SurfaceState,
    cache: Option<SurfaceSnapshot>,
    generation: u64,
    active: bool,
    // A hint arrived while a fetch was in flight; that fetch may predate
    // the mutation, so the surface goes stale again once it lands.
    dirty: bool,
    last_error: Option<String>,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub fn new() -> Self {
        Self {
            state: SurfaceState::Uninitialized,
            cache: None,
            generation: 0,
            active: false,
            dirty: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn cache(&self) -> Option<&SurfaceSnapshot> {
        self.cache.as_ref()
    }

    /// Non-fatal error indicator from the last failed fetch, cleared by the
    /// next successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The rendered badge count: the cached value, optimistically adjusted,
    /// or nothing before the first sync.
    pub fn unread(&self) -> Option<u64> {
        self.cache.as_ref().map(|c| c.unread)
    }

    /// True when the surface must fetch before rendering further state.
    pub fn needs_fetch(&self) -> bool {
        self.active && matches!(self.state, SurfaceState::Stale)
    }

    /// Surface becomes active for its subscriber: issue the initial fetch.
    pub fn activate(&mut self) -> FetchTicket {
        self.active = true;
        self.start_fetch()
    }

    /// Surface navigated away or disconnected. In-flight fetch results are
    /// discarded from here on; state survives for a later reactivation.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.generation += 1;
        if self.state == SurfaceState::Loading {
            self.state = SurfaceState::Stale;
        }
    }

    /// Begin a (re-)fetch. Supersedes any fetch still in flight.
    pub fn start_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.state = SurfaceState::Loading;
        self.dirty = false;
        FetchTicket(self.generation)
    }

    /// A fetch completed. Returns true if the result was applied, false if
    /// it was discarded as stale (superseded or surface deactivated).
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<SurfaceSnapshot, String>,
    ) -> bool {
        if !self.active || ticket.0 != self.generation {
            return false;
        }

        match result {
            Ok(snapshot) => {
                // Wholesale replacement: the cache is exactly one store
                // snapshot, never a partial merge.
                self.cache = Some(snapshot);
                self.last_error = None;
                self.state = if self.dirty {
                    SurfaceState::Stale
                } else {
                    SurfaceState::Synced
                };
                self.dirty = false;
            }
            Err(message) => {
                // Fail open: keep rendering the previous cache, surface a
                // non-fatal error, and stay due for a re-fetch.
                self.last_error = Some(message);
                self.state = SurfaceState::Stale;
            }
        }

        true
    }

    /// A `notification.created` push arrived. The payload is rendered
    /// optimistically; the surface still re-fetches to correct for any
    /// missed events.
    pub fn on_delivery(&mut self, notification: Notification) {
        self.mark_stale();

        if let Some(cache) = self.cache.as_mut() {
            if !cache.page.items.iter().any(|n| n.id == notification.id) {
                if notification.read_at.is_none() {
                    cache.unread += 1;
                }
                cache.page.total += 1;
                cache.page.items.insert(0, notification);
            }
        }
    }

    /// A content-free invalidation signal arrived.
    pub fn on_invalidation(&mut self) {
        self.mark_stale();
    }

    fn mark_stale(&mut self) {
        match self.state {
            SurfaceState::Synced => self.state = SurfaceState::Stale,
            // The in-flight fetch may predate the change; finish it, then
            // go stale.
            SurfaceState::Loading => self.dirty = true,
            SurfaceState::Uninitialized | SurfaceState::Stale => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aula_shared::types::pagination::PaginationParams;
    use chrono::Utc;
    use uuid::Uuid;

    fn notification(read: bool) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            subscriber_id: Uuid::new_v4(),
            kind: "assignment".into(),
            title: "t".into(),
            body: "b".into(),
            payload: None,
            created_at: Utc::now(),
            read_at: read.then(Utc::now),
        }
    }

    fn snapshot(items: Vec<Notification>) -> SurfaceSnapshot {
        let unread = items.iter().filter(|n| n.read_at.is_none()).count() as u64;
        let total = items.len() as u64;
        SurfaceSnapshot {
            page: Paginated::new(items, total, &PaginationParams::default()),
            unread,
        }
    }

    #[test]
    fn initial_fetch_reaches_synced() {
        let mut surface = Surface::new();
        assert_eq!(surface.state(), SurfaceState::Uninitialized);

        let ticket = surface.activate();
        assert_eq!(surface.state(), SurfaceState::Loading);

        assert!(surface.complete_fetch(ticket, Ok(snapshot(vec![notification(false)]))));
        assert_eq!(surface.state(), SurfaceState::Synced);
        assert_eq!(surface.unread(), Some(1));
    }

    #[test]
    fn invalidation_marks_synced_surface_stale() {
        let mut surface = Surface::new();
        let ticket = surface.activate();
        surface.complete_fetch(ticket, Ok(snapshot(vec![])));

        surface.on_invalidation();
        assert_eq!(surface.state(), SurfaceState::Stale);
        assert!(surface.needs_fetch());
    }

    #[test]
    fn delivery_renders_optimistically_but_still_goes_stale() {
        let mut surface = Surface::new();
        let ticket = surface.activate();
        surface.complete_fetch(ticket, Ok(snapshot(vec![notification(true)])));
        assert_eq!(surface.unread(), Some(0));

        surface.on_delivery(notification(false));
        assert_eq!(surface.state(), SurfaceState::Stale);
        assert_eq!(surface.unread(), Some(1));
        assert_eq!(surface.cache().unwrap().page.items.len(), 2);
    }

    #[test]
    fn duplicate_delivery_does_not_double_count() {
        let mut surface = Surface::new();
        let ticket = surface.activate();
        surface.complete_fetch(ticket, Ok(snapshot(vec![])));

        let n = notification(false);
        surface.on_delivery(n.clone());
        surface.on_delivery(n);
        assert_eq!(surface.unread(), Some(1));
        assert_eq!(surface.cache().unwrap().page.items.len(), 1);
    }

    #[test]
    fn refetch_replaces_cache_wholesale() {
        let mut surface = Surface::new();
        let ticket = surface.activate();
        surface.complete_fetch(ticket, Ok(snapshot(vec![notification(false)])));

        surface.on_invalidation();
        let ticket = surface.start_fetch();
        surface.complete_fetch(ticket, Ok(snapshot(vec![])));

        assert_eq!(surface.state(), SurfaceState::Synced);
        assert_eq!(surface.unread(), Some(0));
        assert!(surface.cache().unwrap().page.items.is_empty());
    }

    #[test]
    fn superseded_fetch_result_is_discarded() {
        let mut surface = Surface::new();
        let old_ticket = surface.activate();
        let new_ticket = surface.start_fetch();

        assert!(!surface.complete_fetch(old_ticket, Ok(snapshot(vec![notification(false)]))));
        assert_eq!(surface.state(), SurfaceState::Loading);

        assert!(surface.complete_fetch(new_ticket, Ok(snapshot(vec![]))));
        assert_eq!(surface.unread(), Some(0));
    }

    #[test]
    fn fetch_result_after_deactivate_is_discarded() {
        let mut surface = Surface::new();
        let ticket = surface.activate();
        surface.deactivate();

        assert!(!surface.complete_fetch(ticket, Ok(snapshot(vec![notification(false)]))));
        assert!(surface.cache().is_none());
    }

    #[test]
    fn failed_fetch_fails_open() {
        let mut surface = Surface::new();
        let ticket = surface.activate();
        surface.complete_fetch(ticket, Ok(snapshot(vec![notification(false)])));

        surface.on_invalidation();
        let ticket = surface.start_fetch();
        surface.complete_fetch(ticket, Err("connection reset".into()));

        // Previous cache retained, error visible, still due for a re-fetch.
        assert_eq!(surface.state(), SurfaceState::Stale);
        assert_eq!(surface.unread(), Some(1));
        assert_eq!(surface.last_error(), Some("connection reset"));

        let ticket = surface.start_fetch();
        surface.complete_fetch(ticket, Ok(snapshot(vec![])));
        assert!(surface.last_error().is_none());
    }

    #[test]
    fn hint_during_loading_means_stale_after_sync() {
        let mut surface = Surface::new();
        let ticket = surface.activate();

        // The in-flight fetch might predate this signal.
        surface.on_invalidation();
        surface.complete_fetch(ticket, Ok(snapshot(vec![])));

        assert_eq!(surface.state(), SurfaceState::Stale);
    }
}
