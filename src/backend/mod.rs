// Backend collaborator contract for TeleChat.
// The hosted document-store/realtime-sync service is opaque and external;
// everything the client needs from it fits this trait, and the in-process
// mock (demo mode) implements the same contract behind the same shapes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use crate::error::{AuthError, FeedError, WriteError};
use crate::models::{Actor, Message};

pub mod mock;

pub use mock::MockBackend;

/// Channel capacity for one feed. Producers drop-and-warn rather than block.
pub const FEED_CHANNEL_CAPACITY: usize = 100;

/// Which live feed a subscription serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Contacts,
    Messages,
}

/// Predicate for a live query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// All actor records except the signed-in one.
    Contacts { exclude: String },
    /// All messages of one conversation, ordered by `sent_at` ascending.
    Messages { conversation_id: String },
}

impl Query {
    pub fn kind(&self) -> FeedKind {
        match self {
            Query::Contacts { .. } => FeedKind::Contacts,
            Query::Messages { .. } => FeedKind::Messages,
        }
    }
}

/// Full-snapshot payload of one feed delivery. Feeds never deliver diffs.
#[derive(Debug, Clone)]
pub enum FeedSnapshot {
    Contacts(Vec<Actor>),
    Messages(Vec<Message>),
}

/// One push notification from an open feed.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Snapshot(FeedSnapshot),
    Error(FeedError),
}

/// Handle to one open live feed.
///
/// Owned by the subscription manager. Cancelling sets the shared liveness
/// flag: the producer checks it before every delivery, and `next_event`
/// yields nothing further even for events already queued.
pub struct Subscription {
    kind: FeedKind,
    events: ReceiverStream<FeedEvent>,
    live: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new(kind: FeedKind, events: mpsc::Receiver<FeedEvent>, live: Arc<AtomicBool>) -> Self {
        Subscription {
            kind,
            events: ReceiverStream::new(events),
            live,
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    /// Clone of the liveness flag, so the owner can cancel after the
    /// subscription itself has been moved into a forwarding task.
    pub fn live_handle(&self) -> Arc<AtomicBool> {
        self.live.clone()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Stop the feed. Idempotent.
    pub fn cancel(&mut self) {
        self.live.store(false, Ordering::SeqCst);
    }

    /// Next event in backend delivery order, or `None` once the feed is
    /// cancelled or the producer side is gone.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        if !self.is_live() {
            return None;
        }
        let event = self.events.next().await;
        // Re-check: cancellation may have raced the delivery.
        if !self.is_live() {
            return None;
        }
        event
    }
}

/// The external managed backend, as seen by the client core.
///
/// `authenticate`/`sign_out` cover the delegated identity flow,
/// `upsert_actor`/`update_actor_status` the presence writes, `subscribe` the
/// live snapshot feeds, and `append_message` the single write path.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn authenticate(&self) -> Result<Actor, AuthError>;

    /// Best-effort; callers log and move on when this fails.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Create-if-absent, else merge onto the existing actor record.
    async fn upsert_actor(&self, actor: &Actor) -> Result<(), WriteError>;

    async fn update_actor_status(
        &self,
        id: &str,
        is_online: bool,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<(), WriteError>;

    /// Open a live feed for `query`. The first snapshot is delivered
    /// immediately; later ones follow every matching change, in commit order.
    async fn subscribe(&self, query: Query) -> Result<Subscription, FeedError>;

    async fn append_message(&self, message: Message) -> Result<(), WriteError>;
}
