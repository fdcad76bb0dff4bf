// Reconciler and resolver properties: deterministic rendering, ordering,
// placeholders, and the status-label buckets.

use chrono::{Duration, TimeZone, Utc};

use telechat::chat::conversation::conversation_id;
use telechat::chat::reconcile::{
    last_seen_label, render_contacts, render_thread, status_label, Direction, ThreadEntry,
};
use telechat::models::{Actor, Message};

fn actor(id: &str, name: &str, online: bool, last_seen_minutes: Option<i64>) -> Actor {
    let now = Utc::now();
    Actor {
        id: id.to_string(),
        display_name: name.to_string(),
        photo_url: None,
        is_online: online,
        last_seen_at: last_seen_minutes.map(|m| now - Duration::minutes(m)),
    }
}

fn message(text: &str, sender: &str, receiver: &str, minutes_ago: i64) -> Message {
    Message {
        id: uuid::Uuid::new_v4().to_string(),
        text: text.to_string(),
        sender_id: sender.to_string(),
        sender_name: sender.to_string(),
        sender_photo_url: None,
        receiver_id: receiver.to_string(),
        conversation_id: conversation_id(sender, receiver),
        sent_at: Utc::now() - Duration::minutes(minutes_ago),
        read: false,
    }
}

#[test]
fn resolver_is_symmetric() {
    for (a, b) in [("alice", "bob"), ("u1", "u2"), ("demo_user_1_x", "demo_user_2")] {
        assert_eq!(conversation_id(a, b), conversation_id(b, a));
    }
}

#[test]
fn rendering_is_order_preserving_across_snapshots() {
    let now = Utc::now();
    let m1 = message("first", "alice", "bob", 10);
    let m2 = message("second", "bob", "alice", 5);
    let m3 = message("third", "alice", "bob", 1);

    let two = render_thread("private_alice_bob", "alice", "Bob", &[m1.clone(), m2.clone()], now);
    let three = render_thread("private_alice_bob", "alice", "Bob", &[m1, m2, m3], now);

    let two_msgs = two.messages();
    let three_msgs = three.messages();
    assert_eq!(two_msgs.len(), 2);
    assert_eq!(three_msgs.len(), 3);
    // A grown snapshot only appends: the leading entries are untouched.
    assert_eq!(three_msgs[0], two_msgs[0]);
    assert_eq!(three_msgs[1], two_msgs[1]);
}

#[test]
fn rendering_is_deterministic() {
    let now = Utc::now();
    let messages = vec![
        message("first", "alice", "bob", 10),
        message("second", "bob", "alice", 5),
    ];
    let a = render_thread("private_alice_bob", "alice", "Bob", &messages, now);
    let b = render_thread("private_alice_bob", "alice", "Bob", &messages, now);
    assert_eq!(a, b);
}

#[test]
fn sent_received_classification_follows_sender() {
    let now = Utc::now();
    let view = render_thread(
        "private_alice_bob",
        "alice",
        "Bob",
        &[message("mine", "alice", "bob", 2), message("yours", "bob", "alice", 1)],
        now,
    );
    let msgs = view.messages();
    assert_eq!(msgs[0].direction, Direction::Sent);
    assert_eq!(msgs[1].direction, Direction::Received);
}

#[test]
fn empty_thread_renders_start_placeholder() {
    let view = render_thread("private_alice_bob", "alice", "Bob", &[], Utc::now());
    assert!(view.entries.is_empty());
    let placeholder = view.placeholder.expect("placeholder required");
    assert!(placeholder.contains("Start a conversation with Bob"));
}

#[test]
fn empty_contacts_render_no_contacts_placeholder() {
    let view = render_contacts(&[], "alice", Utc::now());
    assert!(view.entries.is_empty());
    let placeholder = view.placeholder.expect("placeholder required");
    assert!(placeholder.contains("No other users online"));
}

#[test]
fn contacts_exclude_self_and_keep_snapshot_order() {
    let now = Utc::now();
    let actors = vec![
        actor("bob", "Bob Johnson", false, Some(5)),
        actor("alice", "Alice Smith", true, None),
        actor("carol", "Carol Reed", true, None),
    ];
    let view = render_contacts(&actors, "alice", now);
    let ids: Vec<&str> = view.entries.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["bob", "carol"]);
    assert!(view.placeholder.is_none());
}

#[test]
fn date_separators_appear_once_per_day() {
    let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
    let yesterday = now - Duration::days(1);
    let mut m1 = message("old one", "bob", "alice", 0);
    m1.sent_at = yesterday - Duration::minutes(10);
    let mut m2 = message("old two", "alice", "bob", 0);
    m2.sent_at = yesterday - Duration::minutes(5);
    let mut m3 = message("fresh", "bob", "alice", 0);
    m3.sent_at = now - Duration::minutes(5);

    let view = render_thread("private_alice_bob", "alice", "Bob", &[m1, m2, m3], now);
    let separators: Vec<&str> = view
        .entries
        .iter()
        .filter_map(|e| match e {
            ThreadEntry::DateSeparator(label) => Some(label.as_str()),
            ThreadEntry::Message(_) => None,
        })
        .collect();
    assert_eq!(separators, vec!["May 19, 2024", "Today"]);
}

#[test]
fn status_label_boundaries() {
    assert_eq!(last_seen_label(0), "Just now");
    assert_eq!(last_seen_label(59), "Last seen 59 min ago");
    assert_eq!(last_seen_label(60), "Last seen 1 hours ago");
    assert_eq!(last_seen_label(1439), "Last seen 23 hours ago");
    assert_eq!(last_seen_label(1440), "Last seen 1 days ago");
}

#[test]
fn status_label_prefers_online_and_handles_missing_last_seen() {
    let now = Utc::now();
    assert_eq!(status_label(&actor("a", "A", true, Some(90)), now), "Online");
    assert_eq!(status_label(&actor("b", "B", false, None), now), "Offline");
    assert_eq!(
        status_label(&actor("c", "C", false, Some(5)), now),
        "Last seen 5 min ago"
    );
}
