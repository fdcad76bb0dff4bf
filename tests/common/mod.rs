// Shared helpers for TeleChat integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Once};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use telechat::backend::{Backend, MockBackend, Query, Subscription};
use telechat::chat::feeds::ViewUpdate;
use telechat::chat::{ChatClient, ViewState};
use telechat::error::{AuthError, FeedError, WriteError};
use telechat::models::{Actor, Message};

static INIT: Once = Once::new();

/// Initialize test logging once per test binary.
pub fn setup_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A signed-in demo client plus its update channel, a fresh view, and the
/// backend it talks to.
pub async fn demo_client(
    slot: u8,
) -> (
    ChatClient,
    mpsc::Receiver<ViewUpdate>,
    ViewState,
    Arc<MockBackend>,
) {
    setup_logging();
    let backend = Arc::new(MockBackend::new(slot));
    let (mut client, update_rx) = ChatClient::new(backend.clone());
    client.login().await.expect("demo login should succeed");
    (client, update_rx, ViewState::new(), backend)
}

/// Apply queued view updates until the channel stays quiet for `quiet`.
pub async fn drain_updates(
    client: &ChatClient,
    view: &mut ViewState,
    rx: &mut mpsc::Receiver<ViewUpdate>,
    quiet: Duration,
) {
    while let Ok(Some(update)) = timeout(quiet, rx.recv()).await {
        client.apply_update(view, update);
    }
}

/// Backend whose sign-in always fails with the configured cause.
pub struct FailingAuthBackend(pub AuthError);

#[async_trait]
impl Backend for FailingAuthBackend {
    async fn authenticate(&self) -> Result<Actor, AuthError> {
        Err(self.0.clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn upsert_actor(&self, _actor: &Actor) -> Result<(), WriteError> {
        Ok(())
    }

    async fn update_actor_status(
        &self,
        _id: &str,
        _is_online: bool,
        _last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<(), WriteError> {
        Ok(())
    }

    async fn subscribe(&self, _query: Query) -> Result<Subscription, FeedError> {
        Err(FeedError::Unreachable)
    }

    async fn append_message(&self, _message: Message) -> Result<(), WriteError> {
        Err(WriteError::Unreachable)
    }
}

/// Backend that signs in fine but whose feeds and writes are unreachable.
pub struct DeadFeedBackend;

#[async_trait]
impl Backend for DeadFeedBackend {
    async fn authenticate(&self) -> Result<Actor, AuthError> {
        Ok(Actor {
            id: "u_flaky".to_string(),
            display_name: "Flaky User".to_string(),
            photo_url: None,
            is_online: true,
            last_seen_at: Some(Utc::now()),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn upsert_actor(&self, _actor: &Actor) -> Result<(), WriteError> {
        Ok(())
    }

    async fn update_actor_status(
        &self,
        _id: &str,
        _is_online: bool,
        _last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<(), WriteError> {
        Ok(())
    }

    async fn subscribe(&self, _query: Query) -> Result<Subscription, FeedError> {
        Err(FeedError::Unreachable)
    }

    async fn append_message(&self, _message: Message) -> Result<(), WriteError> {
        Err(WriteError::Unreachable)
    }
}
