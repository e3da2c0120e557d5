//! Client-side session cache.
//!
//! Holds the last fetched session and decides when a refresh event warrants
//! another round-trip. Observers pull snapshots from a watch channel owned by
//! [`crate::session::AuthClient`].

use std::time::{Duration, Instant};

use serde_json::Value;

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshEvent {
    /// First load after construction.
    Initial,
    /// Stored credentials changed (sign-in, sign-out).
    Storage,
    /// The app regained focus.
    Focus,
    /// Periodic poll.
    Poll,
}

/// Cached session value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CachedSession {
    /// Never fetched.
    #[default]
    Unknown,
    /// Fetched; the web app reported no session.
    Absent,
    /// Fetched; the session payload.
    Present(Value),
}

/// Coarse session status exposed to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Value published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub data: Option<Value>,
}

impl SessionSnapshot {
    /// Snapshot before the first fetch completes.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            data: None,
        }
    }
}

/// Last-sync bookkeeping for the session.
#[derive(Debug, Clone)]
pub struct SessionCache {
    last_sync: Option<Instant>,
    session: CachedSession,
    stale_after: Option<Duration>,
    loading: bool,
}

impl SessionCache {
    /// Creates an empty cache. With `stale_after = None` a present session is
    /// refetched on every focus or poll event; a threshold limits those
    /// refetches to sessions older than it.
    #[must_use]
    pub fn new(stale_after: Option<Duration>) -> Self {
        Self {
            last_sync: None,
            session: CachedSession::Unknown,
            stale_after,
            loading: true,
        }
    }

    /// Whether `event` at `now` should trigger a fetch.
    #[must_use]
    pub fn should_refetch(&self, event: RefreshEvent, now: Instant) -> bool {
        if event == RefreshEvent::Storage || self.session == CachedSession::Unknown {
            return true;
        }
        if event == RefreshEvent::Initial || self.session == CachedSession::Absent {
            return false;
        }
        match (self.stale_after, self.last_sync) {
            (Some(stale_after), Some(last_sync)) => now.duration_since(last_sync) >= stale_after,
            (None, _) | (_, None) => true,
        }
    }

    /// Records a completed fetch.
    pub fn record(&mut self, session: Option<Value>, now: Instant) {
        self.last_sync = Some(now);
        self.session = session.map_or(CachedSession::Absent, CachedSession::Present);
        self.loading = false;
    }

    /// Marks the current refresh as finished without new data.
    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    /// Forgets everything, as on teardown.
    pub fn reset(&mut self) {
        self.last_sync = None;
        self.session = CachedSession::Unknown;
        self.loading = true;
    }

    /// Cached session value.
    #[must_use]
    pub fn session(&self) -> &CachedSession {
        &self.session
    }

    /// Time of the last completed fetch.
    #[must_use]
    pub fn last_sync(&self) -> Option<Instant> {
        self.last_sync
    }

    /// Current snapshot for subscribers.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        if self.loading {
            return SessionSnapshot::loading();
        }
        match &self.session {
            CachedSession::Present(value) => SessionSnapshot {
                status: SessionStatus::Authenticated,
                data: Some(value.clone()),
            },
            CachedSession::Absent | CachedSession::Unknown => SessionSnapshot {
                status: SessionStatus::Unauthenticated,
                data: None,
            },
        }
    }
}
