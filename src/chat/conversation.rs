// Conversation identity.
// A conversation has no record of its own anywhere; it exists only as this
// derived key over an unordered pair of actor ids.

/// Derive the symmetric conversation key for two actors.
///
/// The pair is sorted before concatenation, so `(a, b)` and `(b, a)` resolve
/// to the same key. Both ids must be non-empty and distinct; anything else is
/// a caller bug and fails fast.
pub fn conversation_id(a: &str, b: &str) -> String {
    assert!(!a.is_empty() && !b.is_empty(), "conversation requires two actor ids");
    assert!(a != b, "conversation requires two distinct actors");
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    format!("private_{}_{}", lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_for_any_pair() {
        assert_eq!(conversation_id("alice", "bob"), conversation_id("bob", "alice"));
        assert_eq!(conversation_id("alice", "bob"), "private_alice_bob");
    }

    #[test]
    fn stable_for_demo_ids() {
        let id = conversation_id("demo_user_1_00c0ffee", "demo_user_2");
        assert_eq!(id, conversation_id("demo_user_2", "demo_user_1_00c0ffee"));
        assert!(id.starts_with("private_"));
    }

    #[test]
    #[should_panic(expected = "two actor ids")]
    fn rejects_empty_id() {
        conversation_id("", "bob");
    }

    #[test]
    #[should_panic(expected = "distinct")]
    fn rejects_self_conversation() {
        conversation_id("alice", "alice");
    }
}
