// Snapshot reconciliation: ordered remote records in, deterministic view
// state out. These are pure functions over their arguments; the clock
// instant is an explicit parameter, so the same snapshot always renders the
// same view.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::FeedError;
use crate::models::{Actor, Message};

/// Whether a message was composed by the signed-in actor. This is the only
/// classification that affects layout (alignment, sender-name visibility).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub direction: Direction,
    pub sender_name: String,
    pub sender_initial: char,
    pub text: String,
    pub time_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEntry {
    /// Inserted once per distinct calendar day.
    DateSeparator(String),
    Message(MessageView),
}

/// Rendered state of the message pane. An empty or failed feed renders an
/// explicit placeholder, never an empty container.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadView {
    pub conversation_id: String,
    pub entries: Vec<ThreadEntry>,
    pub placeholder: Option<String>,
}

impl ThreadView {
    /// Pane state before any contact has been selected.
    pub fn welcome() -> Self {
        ThreadView {
            conversation_id: String::new(),
            entries: Vec::new(),
            placeholder: Some("Select a contact to start chatting".to_string()),
        }
    }

    pub fn error(conversation_id: &str, cause: &FeedError) -> Self {
        ThreadView {
            conversation_id: conversation_id.to_string(),
            entries: Vec::new(),
            placeholder: Some(format!("Error loading messages ({}). Please refresh.", cause)),
        }
    }

    /// Message rows only, separators skipped.
    pub fn messages(&self) -> Vec<&MessageView> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                ThreadEntry::Message(m) => Some(m),
                ThreadEntry::DateSeparator(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactView {
    pub id: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub initial: char,
    pub is_online: bool,
    pub status_label: String,
}

/// Rendered state of the contact sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactListView {
    pub entries: Vec<ContactView>,
    pub placeholder: Option<String>,
}

impl ContactListView {
    /// Sidebar state before the first snapshot lands.
    pub fn loading() -> Self {
        ContactListView {
            entries: Vec::new(),
            placeholder: Some("Loading contacts...".to_string()),
        }
    }

    pub fn error(cause: &FeedError) -> Self {
        ContactListView {
            entries: Vec::new(),
            placeholder: Some(format!("Error loading contacts ({}). Please refresh.", cause)),
        }
    }
}

/// Human status line for a contact row.
pub fn status_label(actor: &Actor, now: DateTime<Utc>) -> String {
    if actor.is_online {
        return "Online".to_string();
    }
    match actor.last_seen_at {
        Some(seen) => last_seen_label((now - seen).num_minutes().max(0)),
        None => "Offline".to_string(),
    }
}

/// Bucketed "last seen" label from elapsed minutes.
pub fn last_seen_label(minutes: i64) -> String {
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("Last seen {} min ago", minutes)
    } else if minutes < 1440 {
        format!("Last seen {} hours ago", minutes / 60)
    } else {
        format!("Last seen {} days ago", minutes / 1440)
    }
}

fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else {
        day.format("%B %-d, %Y").to_string()
    }
}

fn time_label(sent_at: DateTime<Utc>) -> String {
    sent_at.format("%H:%M").to_string()
}

fn initial_of(name: &str) -> char {
    name.chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('U')
}

/// Rebuild the message pane from a full ordered snapshot.
///
/// `messages` must already be in `sent_at` ascending order (the feed
/// contract); rendering preserves that order and inserts a date separator at
/// every calendar-day boundary.
pub fn render_thread(
    conversation_id: &str,
    self_id: &str,
    peer_name: &str,
    messages: &[Message],
    now: DateTime<Utc>,
) -> ThreadView {
    if messages.is_empty() {
        return ThreadView {
            conversation_id: conversation_id.to_string(),
            entries: Vec::new(),
            placeholder: Some(format!(
                "Start a conversation with {}. Send your first message!",
                peer_name
            )),
        };
    }

    let today = now.date_naive();
    let mut entries = Vec::with_capacity(messages.len() + 1);
    let mut current_day: Option<NaiveDate> = None;

    for message in messages {
        let day = message.sent_at.date_naive();
        if current_day != Some(day) {
            entries.push(ThreadEntry::DateSeparator(day_label(day, today)));
            current_day = Some(day);
        }
        let direction = if message.sender_id == self_id {
            Direction::Sent
        } else {
            Direction::Received
        };
        entries.push(ThreadEntry::Message(MessageView {
            direction,
            sender_name: message.sender_name.clone(),
            sender_initial: initial_of(&message.sender_name),
            text: message.text.clone(),
            time_label: time_label(message.sent_at),
        }));
    }

    ThreadView {
        conversation_id: conversation_id.to_string(),
        entries,
        placeholder: None,
    }
}

/// Rebuild the contact sidebar from a full snapshot, in snapshot order.
pub fn render_contacts(actors: &[Actor], self_id: &str, now: DateTime<Utc>) -> ContactListView {
    let entries: Vec<ContactView> = actors
        .iter()
        .filter(|a| a.id != self_id)
        .map(|a| ContactView {
            id: a.id.clone(),
            display_name: a.display_name.clone(),
            photo_url: a.photo_url.clone(),
            initial: a.initial(),
            is_online: a.is_online,
            status_label: status_label(a, now),
        })
        .collect();

    if entries.is_empty() {
        return ContactListView {
            entries,
            placeholder: Some("No other users online. Share this app with friends!".to_string()),
        };
    }

    ContactListView {
        entries,
        placeholder: None,
    }
}
