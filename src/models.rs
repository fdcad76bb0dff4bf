use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat participant: either a federated identity delivered by the backend
/// or a synthetic demo identity created locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub is_online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Actor {
    /// Synthetic identities never touch the real backend (no upsert, no
    /// presence writes, no sign-out call).
    pub fn is_synthetic(&self) -> bool {
        self.id.starts_with("demo_")
    }

    /// Single-letter avatar fallback when no photo URL is present.
    pub fn initial(&self) -> char {
        self.display_name
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('U')
    }
}

/// One entry of the global append-only message log. Immutable once appended;
/// a conversation is the log filtered by `conversation_id`, ordered by
/// `sent_at` ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_photo_url: Option<String>,
    pub receiver_id: String,
    pub conversation_id: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}
