// Live feed ownership for the chat client.
// At most one contact-list subscription and one message-feed subscription
// are open at any instant. Switching cancels the old feed before the new one
// is installed, and every forwarded update carries the generation of the
// subscription that produced it, so a superseded feed can never touch view
// state even when its snapshots are already queued.

use chrono::Utc;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::{Backend, FeedEvent, FeedSnapshot, Query, Subscription};
use crate::chat::reconcile::{self, ContactListView, ThreadView};
use crate::error::FeedError;

/// A reconciled snapshot (or feed failure rendered as a placeholder view),
/// tagged with the generation of the subscription it came from.
#[derive(Debug, Clone)]
pub enum ViewUpdate {
    Contacts { generation: u64, view: ContactListView },
    Thread { generation: u64, view: ThreadView },
}

/// What a message-feed forwarding task needs to reconcile its snapshots.
#[derive(Debug, Clone)]
pub struct ThreadContext {
    pub conversation_id: String,
    pub self_id: String,
    pub peer_name: String,
}

struct FeedHandle {
    generation: u64,
    live: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    fn cancel(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

pub struct FeedManager {
    backend: Arc<dyn Backend>,
    update_tx: mpsc::Sender<ViewUpdate>,
    contact_generation: Arc<AtomicU64>,
    thread_generation: Arc<AtomicU64>,
    contact_feed: Option<FeedHandle>,
    thread_feed: Option<FeedHandle>,
}

impl FeedManager {
    pub fn new(backend: Arc<dyn Backend>, update_tx: mpsc::Sender<ViewUpdate>) -> Self {
        FeedManager {
            backend,
            update_tx,
            contact_generation: Arc::new(AtomicU64::new(0)),
            thread_generation: Arc::new(AtomicU64::new(0)),
            contact_feed: None,
            thread_feed: None,
        }
    }

    /// Generation of the currently installed contact feed. Updates tagged
    /// with anything else are stale.
    pub fn contact_generation(&self) -> u64 {
        self.contact_generation.load(Ordering::SeqCst)
    }

    pub fn thread_generation(&self) -> u64 {
        self.thread_generation.load(Ordering::SeqCst)
    }

    /// Install the live contact-list feed for the signed-in actor, replacing
    /// any previous one.
    pub async fn open_contact_feed(&mut self, self_id: &str) -> Result<(), FeedError> {
        self.close_contact_feed();
        let generation = self.contact_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = Query::Contacts {
            exclude: self_id.to_string(),
        };
        let subscription = match self.backend.subscribe(query).await {
            Ok(s) => s,
            Err(cause) => {
                warn!("contact feed subscription failed: {}", cause);
                let _ = self
                    .update_tx
                    .send(ViewUpdate::Contacts {
                        generation,
                        view: ContactListView::error(&cause),
                    })
                    .await;
                return Err(cause);
            }
        };

        let live = subscription.live_handle();
        let task = Self::spawn_contact_task(
            subscription,
            generation,
            self.contact_generation.clone(),
            self_id.to_string(),
            self.update_tx.clone(),
        );
        self.contact_feed = Some(FeedHandle {
            generation,
            live,
            task,
        });
        debug!("contact feed opened (generation {})", generation);
        Ok(())
    }

    /// Install the live message feed for one conversation. The previous
    /// message feed is cancelled before the new subscription exists, so at
    /// most one message-feed callback is ever live.
    pub async fn open_message_feed(&mut self, ctx: ThreadContext) -> Result<(), FeedError> {
        self.close_message_feed();
        let generation = self.thread_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = Query::Messages {
            conversation_id: ctx.conversation_id.clone(),
        };
        let subscription = match self.backend.subscribe(query).await {
            Ok(s) => s,
            Err(cause) => {
                warn!("message feed subscription failed: {}", cause);
                let _ = self
                    .update_tx
                    .send(ViewUpdate::Thread {
                        generation,
                        view: ThreadView::error(&ctx.conversation_id, &cause),
                    })
                    .await;
                return Err(cause);
            }
        };

        let live = subscription.live_handle();
        let task = Self::spawn_thread_task(
            subscription,
            generation,
            self.thread_generation.clone(),
            ctx,
            self.update_tx.clone(),
        );
        self.thread_feed = Some(FeedHandle {
            generation,
            live,
            task,
        });
        debug!("message feed opened (generation {})", generation);
        Ok(())
    }

    pub fn close_contact_feed(&mut self) {
        if let Some(handle) = self.contact_feed.take() {
            debug!("closing contact feed (generation {})", handle.generation);
            handle.cancel();
        }
        // Invalidate anything still queued from the old feed.
        self.contact_generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn close_message_feed(&mut self) {
        if let Some(handle) = self.thread_feed.take() {
            debug!("closing message feed (generation {})", handle.generation);
            handle.cancel();
        }
        self.thread_generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Cancel every open feed. Idempotent; safe with nothing open.
    pub fn close_all(&mut self) {
        self.close_contact_feed();
        self.close_message_feed();
    }

    fn spawn_contact_task(
        mut subscription: Subscription,
        generation: u64,
        current: Arc<AtomicU64>,
        self_id: String,
        update_tx: mpsc::Sender<ViewUpdate>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                if current.load(Ordering::SeqCst) != generation {
                    debug!("contact feed generation {} superseded, stopping", generation);
                    break;
                }
                match event {
                    FeedEvent::Snapshot(FeedSnapshot::Contacts(actors)) => {
                        let view = reconcile::render_contacts(&actors, &self_id, Utc::now());
                        if update_tx
                            .send(ViewUpdate::Contacts { generation, view })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    FeedEvent::Snapshot(FeedSnapshot::Messages(_)) => {
                        warn!("contact feed delivered a message snapshot, ignoring");
                    }
                    FeedEvent::Error(cause) => {
                        warn!("contact feed failed: {}", cause);
                        let _ = update_tx
                            .send(ViewUpdate::Contacts {
                                generation,
                                view: ContactListView::error(&cause),
                            })
                            .await;
                        // No automatic retry; the user refreshes explicitly.
                        break;
                    }
                }
            }
            debug!("contact feed task finished (generation {})", generation);
        })
    }

    fn spawn_thread_task(
        mut subscription: Subscription,
        generation: u64,
        current: Arc<AtomicU64>,
        ctx: ThreadContext,
        update_tx: mpsc::Sender<ViewUpdate>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                if current.load(Ordering::SeqCst) != generation {
                    debug!("message feed generation {} superseded, stopping", generation);
                    break;
                }
                match event {
                    FeedEvent::Snapshot(FeedSnapshot::Messages(messages)) => {
                        let view = reconcile::render_thread(
                            &ctx.conversation_id,
                            &ctx.self_id,
                            &ctx.peer_name,
                            &messages,
                            Utc::now(),
                        );
                        if update_tx
                            .send(ViewUpdate::Thread { generation, view })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    FeedEvent::Snapshot(FeedSnapshot::Contacts(_)) => {
                        warn!("message feed delivered a contact snapshot, ignoring");
                    }
                    FeedEvent::Error(cause) => {
                        warn!("message feed failed: {}", cause);
                        let _ = update_tx
                            .send(ViewUpdate::Thread {
                                generation,
                                view: ThreadView::error(&ctx.conversation_id, &cause),
                            })
                            .await;
                        break;
                    }
                }
            }
            debug!("message feed task finished (generation {})", generation);
        })
    }
}

impl Drop for FeedManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
