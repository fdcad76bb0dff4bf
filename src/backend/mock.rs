// Demo-mode backend for TeleChat.
// Stands in for the hosted service when the user signs in with a local demo
// identity: canned contacts, a canned seed thread per conversation, and a
// timer-based one-shot reply when a composed message contains the trigger
// word. Everything flows through the same record shapes and feed contract as
// the real backend, so the reconciler cannot tell the two apart.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lazy_static::lazy_static;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;

use crate::backend::{
    Backend, FeedEvent, FeedKind, FeedSnapshot, Query, Subscription, FEED_CHANNEL_CAPACITY,
};
use crate::chat::conversation::conversation_id;
use crate::error::{AuthError, FeedError, WriteError};
use crate::models::{Actor, Message};

/// Delay before the synthetic peer reply fires.
pub const REPLY_DELAY: Duration = Duration::from_millis(1000);

/// Case-insensitive substring that triggers the synthetic reply.
const REPLY_TRIGGER: &str = "hello";

struct CannedContact {
    id: &'static str,
    name: &'static str,
    online: bool,
    last_seen_minutes: Option<i64>,
}

lazy_static! {
    /// Roster visible to each demo slot.
    static ref CANNED_CONTACTS: HashMap<u8, Vec<CannedContact>> = {
        let mut m = HashMap::new();
        m.insert(1, vec![
            CannedContact { id: "demo_user_2", name: "Demo User 2", online: true, last_seen_minutes: None },
            CannedContact { id: "demo_user_3", name: "Demo User 3", online: false, last_seen_minutes: Some(5) },
        ]);
        m.insert(2, vec![
            CannedContact { id: "demo_user_1", name: "Demo User 1", online: true, last_seen_minutes: None },
            CannedContact { id: "demo_user_3", name: "Demo User 3", online: false, last_seen_minutes: Some(10) },
        ]);
        m
    };
}

// Seed thread shown in every fresh demo conversation; `true` marks lines
// spoken by the peer.
const SEED_THREAD: &[(bool, &str)] = &[
    (true, "Hello! This is a demo chat."),
    (false, "Hi there! Nice to meet you."),
    (true, "This is how real-time chat works between two users."),
    (false, "I can see your messages instantly!"),
    (true, "Yes! And if another user joins, they will appear in your contacts list."),
];

struct FeedTarget {
    query: Query,
    tx: mpsc::Sender<FeedEvent>,
    live: Arc<AtomicBool>,
}

struct PendingReply {
    conversation_id: String,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct MockState {
    actors: HashMap<String, Actor>,
    log: Vec<Message>,
    seeded: HashSet<String>,
    subscribers: Vec<FeedTarget>,
    pending_reply: Option<PendingReply>,
}

/// In-memory stand-in for the hosted backend, shared across clones.
pub struct MockBackend {
    slot: u8,
    state: Arc<TokioMutex<MockState>>,
}

impl MockBackend {
    /// `slot` selects which demo identity signs in (1 or 2) and which canned
    /// roster it sees. The roster exists from construction so a resumed
    /// session sees contacts without re-authenticating.
    pub fn new(slot: u8) -> Self {
        let now = Utc::now();
        let mut actors = HashMap::new();
        if let Some(canned) = CANNED_CONTACTS.get(&slot) {
            for c in canned {
                actors.insert(
                    c.id.to_string(),
                    Actor {
                        id: c.id.to_string(),
                        display_name: c.name.to_string(),
                        photo_url: None,
                        is_online: c.online,
                        last_seen_at: c.last_seen_minutes.map(|m| now - ChronoDuration::minutes(m)),
                    },
                );
            }
        }
        MockBackend {
            slot,
            state: Arc::new(TokioMutex::new(MockState {
                actors,
                ..Default::default()
            })),
        }
    }

    fn snapshot_for(state: &MockState, query: &Query) -> FeedSnapshot {
        match query {
            Query::Contacts { exclude } => {
                let mut actors: Vec<Actor> = state
                    .actors
                    .values()
                    .filter(|a| a.id != *exclude)
                    .cloned()
                    .collect();
                // Stable server-side ordering for deterministic snapshots.
                actors.sort_by(|a, b| a.display_name.cmp(&b.display_name));
                FeedSnapshot::Contacts(actors)
            }
            Query::Messages { conversation_id } => {
                let mut messages: Vec<Message> = state
                    .log
                    .iter()
                    .filter(|m| m.conversation_id == *conversation_id)
                    .cloned()
                    .collect();
                messages.sort_by_key(|m| m.sent_at);
                FeedSnapshot::Messages(messages)
            }
        }
    }

    /// Push a fresh full snapshot to every live subscriber the change is
    /// visible to. Closed or cancelled subscribers are pruned on the way.
    fn broadcast(state: &mut MockState, kind: FeedKind, conversation: Option<&str>) {
        state
            .subscribers
            .retain(|t| t.live.load(Ordering::SeqCst) && !t.tx.is_closed());

        let targets: Vec<(Query, mpsc::Sender<FeedEvent>)> = state
            .subscribers
            .iter()
            .filter(|t| match (&t.query, conversation) {
                (Query::Contacts { .. }, _) => kind == FeedKind::Contacts,
                (Query::Messages { conversation_id }, Some(cid)) => {
                    kind == FeedKind::Messages && conversation_id == cid
                }
                (Query::Messages { .. }, None) => kind == FeedKind::Messages,
            })
            .map(|t| (t.query.clone(), t.tx.clone()))
            .collect();

        for (query, tx) in targets {
            let snapshot = Self::snapshot_for(state, &query);
            if let Err(e) = tx.try_send(FeedEvent::Snapshot(snapshot)) {
                match e {
                    mpsc::error::TrySendError::Full(_) => {
                        warn!("demo feed subscriber is not draining, snapshot dropped");
                    }
                    mpsc::error::TrySendError::Closed(_) => {
                        debug!("demo feed subscriber closed, will be pruned on next notify");
                    }
                }
            }
        }
    }

    /// Seed the canned thread for `conversation` once, on first contact.
    fn seed_conversation(state: &mut MockState, me: &Actor, peer: &Actor, now: DateTime<Utc>) {
        let cid = conversation_id(&me.id, &peer.id);
        if !state.seeded.insert(cid.clone()) {
            return;
        }
        let count = SEED_THREAD.len() as i64;
        for (i, (from_peer, text)) in SEED_THREAD.iter().enumerate() {
            let (sender, receiver) = if *from_peer { (peer, me) } else { (me, peer) };
            state.log.push(Message {
                id: uuid::Uuid::new_v4().to_string(),
                text: (*text).to_string(),
                sender_id: sender.id.clone(),
                sender_name: sender.display_name.clone(),
                sender_photo_url: sender.photo_url.clone(),
                receiver_id: receiver.id.clone(),
                conversation_id: cid.clone(),
                sent_at: now - ChronoDuration::minutes(count - i as i64),
                read: true,
            });
        }
    }

    fn schedule_reply(&self, state: &mut MockState, trigger: &Message, peer: Actor) {
        // One-shot at a time; a newer trigger supersedes an unfired reply.
        if let Some(stale) = state.pending_reply.take() {
            stale.task.abort();
        }

        let reply_text = format!("Thanks for your message: \"{}\"", trigger.text);
        let conversation = trigger.conversation_id.clone();
        let receiver_id = trigger.sender_id.clone();
        let state_arc = self.state.clone();
        let task_conversation = conversation.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(REPLY_DELAY).await;
            let mut state = state_arc.lock().await;
            state.pending_reply = None;

            // The viewer may have navigated away while the timer ran; a reply
            // with no live watcher would surface in the wrong view later.
            let watched = state.subscribers.iter().any(|t| {
                t.live.load(Ordering::SeqCst)
                    && matches!(&t.query, Query::Messages { conversation_id } if *conversation_id == task_conversation)
            });
            if !watched {
                debug!("conversation {} no longer watched, dropping synthetic reply", task_conversation);
                return;
            }

            state.log.push(Message {
                id: uuid::Uuid::new_v4().to_string(),
                text: reply_text,
                sender_id: peer.id.clone(),
                sender_name: peer.display_name.clone(),
                sender_photo_url: peer.photo_url.clone(),
                receiver_id,
                conversation_id: task_conversation.clone(),
                sent_at: Utc::now(),
                read: false,
            });
            Self::broadcast(&mut state, FeedKind::Messages, Some(&task_conversation));
        });

        state.pending_reply = Some(PendingReply {
            conversation_id: conversation,
            task,
        });
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn authenticate(&self) -> Result<Actor, AuthError> {
        let now = Utc::now();
        let me = Actor {
            // Unique per login, like the hosted identities.
            id: format!("demo_user_{}_{:08x}", self.slot, rand::random::<u32>()),
            display_name: format!("Demo User {}", self.slot),
            photo_url: None,
            is_online: true,
            last_seen_at: Some(now),
        };

        let canned = CANNED_CONTACTS
            .get(&self.slot)
            .ok_or_else(|| AuthError::Unknown(format!("no demo slot {}", self.slot)))?;

        let mut state = self.state.lock().await;
        for c in canned {
            if let Some(contact) = state.actors.get(c.id).cloned() {
                Self::seed_conversation(&mut state, &me, &contact, now);
            }
        }
        debug!("demo identity {} signed in with {} canned contacts", me.id, canned.len());
        Ok(me)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn upsert_actor(&self, actor: &Actor) -> Result<(), WriteError> {
        let mut state = self.state.lock().await;
        state.actors.insert(actor.id.clone(), actor.clone());
        Self::broadcast(&mut state, FeedKind::Contacts, None);
        Ok(())
    }

    async fn update_actor_status(
        &self,
        id: &str,
        is_online: bool,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<(), WriteError> {
        let mut state = self.state.lock().await;
        if let Some(actor) = state.actors.get_mut(id) {
            actor.is_online = is_online;
            actor.last_seen_at = last_seen_at;
            Self::broadcast(&mut state, FeedKind::Contacts, None);
        }
        Ok(())
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, FeedError> {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let live = Arc::new(AtomicBool::new(true));

        let mut state = self.state.lock().await;

        // Switching to another conversation cancels an unfired reply aimed at
        // the old one.
        if let Query::Messages { conversation_id } = &query {
            if let Some(pending) = state.pending_reply.take() {
                if pending.conversation_id != *conversation_id {
                    debug!("aborting pending reply for {}", pending.conversation_id);
                    pending.task.abort();
                } else {
                    state.pending_reply = Some(pending);
                }
            }
        }

        let initial = Self::snapshot_for(&state, &query);
        if tx.try_send(FeedEvent::Snapshot(initial)).is_err() {
            warn!("failed to queue initial snapshot for {:?}", query.kind());
        }

        state.subscribers.push(FeedTarget {
            query: query.clone(),
            tx,
            live: live.clone(),
        });

        Ok(Subscription::new(query.kind(), rx, live))
    }

    async fn append_message(&self, message: Message) -> Result<(), WriteError> {
        let mut state = self.state.lock().await;
        state.log.push(message.clone());
        Self::broadcast(&mut state, FeedKind::Messages, Some(&message.conversation_id));

        if message.text.to_lowercase().contains(REPLY_TRIGGER) {
            if let Some(peer) = state.actors.get(&message.receiver_id).cloned() {
                self.schedule_reply(&mut state, &message, peer);
            }
        }
        Ok(())
    }
}
