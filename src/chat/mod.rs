// Chat client core for TeleChat.
// This module owns the session lifecycle and everything reactive around it:
// which feeds are open, how their snapshots become view state, and the one
// place where updates are applied (and stale ones dropped).

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

pub mod conversation;
pub mod feeds;
pub mod reconcile;
pub mod session;

use crate::backend::Backend;
use crate::error::AuthError;
use crate::models::{Actor, Message};
use feeds::{FeedManager, ThreadContext, ViewUpdate};
use reconcile::{ContactListView, ThreadView};
use session::SessionStore;

/// Capacity of the view-update channel between feed tasks and the UI loop.
const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// Everything the UI renders. Mutated only through
/// [`ChatClient::apply_update`], on the loop that drains the update channel.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub contacts: ContactListView,
    pub thread: ThreadView,
}

impl ViewState {
    pub fn new() -> Self {
        ViewState {
            contacts: ContactListView::loading(),
            thread: ThreadView::welcome(),
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrates one signed-in (or signed-out) chat session against a
/// backend. Construction hands back the receiver side of the view-update
/// channel; the owner drains it and applies each update.
pub struct ChatClient {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    feeds: FeedManager,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn Backend>) -> (Self, mpsc::Receiver<ViewUpdate>) {
        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let feeds = FeedManager::new(backend.clone(), update_tx);
        (
            ChatClient {
                backend,
                session: SessionStore::new(),
                feeds,
            },
            update_rx,
        )
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Run the delegated sign-in flow. On success the actor record is
    /// upserted and marked online (real identities only) and the contact
    /// feed opens; on failure the session returns to signed-out and the
    /// error is surfaced keyed by cause.
    pub async fn login(&mut self) -> Result<Actor, AuthError> {
        self.session
            .begin_authentication()
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        let actor = match self.backend.authenticate().await {
            Ok(actor) => actor,
            Err(cause) => {
                warn!("authentication failed: {}", cause);
                self.session.fail_sign_in();
                return Err(cause);
            }
        };

        if !actor.is_synthetic() {
            if let Err(e) = self.backend.upsert_actor(&actor).await {
                warn!("failed to upsert actor record: {}", e);
            }
            if let Err(e) = self
                .backend
                .update_actor_status(&actor.id, true, Some(Utc::now()))
                .await
            {
                warn!("failed to mark {} online: {}", actor.id, e);
            }
        }

        self.session
            .complete_sign_in(actor.clone())
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        if let Err(e) = self.feeds.open_contact_feed(&actor.id).await {
            // The sidebar already shows the error placeholder; the session
            // itself is usable and the user can refresh.
            warn!("contact feed unavailable after login: {}", e);
        }
        Ok(actor)
    }

    /// Resume a cached identity without a new authentication round-trip.
    pub async fn resume(&mut self, actor: Actor) -> Result<()> {
        self.session.restore(actor.clone())?;
        if !actor.is_synthetic() {
            if let Err(e) = self
                .backend
                .update_actor_status(&actor.id, true, Some(Utc::now()))
                .await
            {
                warn!("failed to mark resumed actor {} online: {}", actor.id, e);
            }
        }
        if let Err(e) = self.feeds.open_contact_feed(&actor.id).await {
            warn!("contact feed unavailable after resume: {}", e);
        }
        Ok(())
    }

    /// Select a peer and switch the live message feed to that conversation.
    pub async fn select_contact(
        &mut self,
        peer_id: &str,
        peer_name: &str,
        peer_photo_url: Option<String>,
    ) -> Result<String> {
        let self_id = self
            .session
            .actor()
            .map(|a| a.id.clone())
            .context("cannot select a contact while signed out")?;

        let conversation_id = self
            .session
            .select_peer(peer_id, peer_name, peer_photo_url)?;

        let ctx = ThreadContext {
            conversation_id: conversation_id.clone(),
            self_id,
            peer_name: peer_name.to_string(),
        };
        if let Err(e) = self.feeds.open_message_feed(ctx).await {
            warn!("message feed unavailable for {}: {}", conversation_id, e);
        }
        Ok(conversation_id)
    }

    /// Append a composed message to the selected conversation. Whitespace-only
    /// input is a no-op. On failure the caller keeps the compose input intact
    /// and retries manually.
    pub async fn send_message(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let (actor, peer) = match (self.session.actor(), self.session.selected()) {
            (Some(actor), Some(peer)) => (actor.clone(), peer.clone()),
            _ => bail!("Please select a contact to chat with first."),
        };

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            sender_id: actor.id,
            sender_name: actor.display_name,
            sender_photo_url: actor.photo_url,
            receiver_id: peer.id,
            conversation_id: peer.conversation_id,
            sent_at: Utc::now(),
            read: false,
        };
        self.backend
            .append_message(message)
            .await
            .context("Failed to send message")?;
        Ok(())
    }

    /// Re-open the feeds for the current session state. This is the explicit
    /// user-initiated retry path after a feed error.
    pub async fn refresh(&mut self) -> Result<()> {
        let Some(actor) = self.session.actor().cloned() else {
            return Ok(());
        };
        if let Err(e) = self.feeds.open_contact_feed(&actor.id).await {
            warn!("contact feed refresh failed: {}", e);
        }
        if let Some(peer) = self.session.selected().cloned() {
            let ctx = ThreadContext {
                conversation_id: peer.conversation_id.clone(),
                self_id: actor.id,
                peer_name: peer.display_name,
            };
            if let Err(e) = self.feeds.open_message_feed(ctx).await {
                warn!("message feed refresh failed: {}", e);
            }
        }
        Ok(())
    }

    /// Sign out: mark the actor offline (real identities), cancel every open
    /// feed, clear the session store. Never fails; backend trouble on the way
    /// out is logged and tolerated.
    pub async fn logout(&mut self) {
        if let Some(actor) = self.session.actor().cloned() {
            if !actor.is_synthetic() {
                if let Err(e) = self
                    .backend
                    .update_actor_status(&actor.id, false, Some(Utc::now()))
                    .await
                {
                    warn!("failed to mark {} offline: {}", actor.id, e);
                }
                if let Err(e) = self.backend.sign_out().await {
                    warn!("backend sign-out failed: {}", e);
                }
            }
        }
        self.feeds.close_all();
        if let Some(actor) = self.session.sign_out() {
            info!("{} signed out", actor.id);
        }
    }

    /// Best-effort offline mark for process exit. Fire-and-forget: the write
    /// races process teardown and losing it is acknowledged and tolerated.
    pub fn mark_offline_on_exit(&self) {
        let Some(actor) = self.session.actor() else {
            return;
        };
        if actor.is_synthetic() {
            return;
        }
        let backend = self.backend.clone();
        let id = actor.id.clone();
        tokio::spawn(async move {
            if let Err(e) = backend
                .update_actor_status(&id, false, Some(Utc::now()))
                .await
            {
                warn!("exit-time offline mark for {} failed: {}", id, e);
            }
        });
    }

    /// Apply one feed update to the view state, dropping it when its
    /// generation is no longer current. Returns whether the state changed.
    ///
    /// This is the only place view state is mutated, and it runs on the
    /// single loop draining the update channel, so per-feed snapshots are
    /// applied exactly in delivery order.
    pub fn apply_update(&self, state: &mut ViewState, update: ViewUpdate) -> bool {
        match update {
            ViewUpdate::Contacts { generation, view } => {
                if generation != self.feeds.contact_generation() {
                    debug!("dropping stale contact snapshot (generation {})", generation);
                    return false;
                }
                state.contacts = view;
                true
            }
            ViewUpdate::Thread { generation, view } => {
                if generation != self.feeds.thread_generation() {
                    debug!("dropping stale thread snapshot (generation {})", generation);
                    return false;
                }
                state.thread = view;
                true
            }
        }
    }
}
