//! Registry trait definition.
//!
//! The registry is the set of live sessions and the only state shared between
//! connections. Every method is one atomic step with respect to all others,
//! which is what makes login uniqueness and presence ordering hold.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use natter_shared::protocol::ServerEvent;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::{ChatError, LoginError, SessionId, UserName};

/// Default number of undelivered events a session may have queued.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Sending side of a session's mailbox.
///
/// The session's writer task drains the other end onto the socket. Pushing
/// never waits: a closed mailbox means the writer has stopped, and a full one
/// means the client stopped reading. Either way the registry evicts the
/// session, which the session's own driver observes through [`Outbox::evicted`].
#[derive(Debug, Clone)]
pub struct Outbox {
    events: mpsc::Sender<ServerEvent>,
    eviction: CancellationToken,
}

impl Outbox {
    /// Create a mailbox holding at most `capacity` undelivered events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (events, inbox) = mpsc::channel(capacity.max(1));
        let outbox = Self {
            events,
            eviction: CancellationToken::new(),
        };
        (outbox, inbox)
    }

    /// Queue `event` without waiting.
    pub fn push(&self, event: ServerEvent) -> Result<(), TrySendError<ServerEvent>> {
        self.events.try_send(event)
    }

    /// Tell the owning session that the registry dropped it.
    pub fn evict(&self) {
        self.eviction.cancel();
    }

    pub fn is_evicted(&self) -> bool {
        self.eviction.is_cancelled()
    }

    /// Resolves once [`Outbox::evict`] has been called on any clone.
    pub async fn evicted(&self) {
        self.eviction.cancelled().await
    }
}

/// A session as seen in a registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub name: Option<UserName>,
    pub connected_at: DateTime<Utc>,
}

/// Outcome of removing a session that was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    /// Name the session held, if it had logged in.
    pub name: Option<UserName>,
    /// Number of sessions that were sent `offline <name>`.
    pub notified: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Add a freshly accepted, unauthenticated session.
    async fn attach(&self, id: SessionId, outbox: Outbox);

    /// Claim `name` for session `id`.
    ///
    /// On success the caller has been sent `login ok` followed by one
    /// `online <other>` per other authenticated session, and every other
    /// authenticated session has been sent `online <name>`.
    async fn login(&self, id: SessionId, name: UserName) -> Result<(), LoginError>;

    /// Send `msg <name> <body>` to every authenticated session, the sender included.
    async fn broadcast_message(&self, id: SessionId, body: String) -> Result<(), ChatError>;

    /// Remove session `id` and tell the others it went offline.
    ///
    /// Returns `None` if it was already gone.
    async fn detach(&self, id: SessionId) -> Option<Detached>;

    /// Consistent copy of the current membership, in attach order.
    async fn snapshot(&self) -> Vec<SessionInfo>;

    async fn len(&self) -> usize;
}
