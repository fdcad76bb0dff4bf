// Session store: who is signed in and who they are talking to.
// Replaces the ambient "current user / current chat" globals of a typical
// chat UI with one explicit state machine owned by the client.

use anyhow::{bail, Result};
use log::{debug, info, warn};

use crate::chat::conversation::conversation_id;
use crate::models::Actor;

/// The peer side of the selected conversation, denormalized for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPeer {
    pub id: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub conversation_id: String,
}

/// Lifecycle: `SignedOut -> Authenticating -> SignedIn -> SignedOut`.
/// While signed in, the selection is an orthogonal sub-state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    SignedOut,
    Authenticating,
    SignedIn {
        actor: Actor,
        selected: Option<SelectedPeer>,
    },
}

pub struct SessionStore {
    state: SessionState,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            state: SessionState::SignedOut,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.state, SessionState::SignedIn { .. })
    }

    pub fn actor(&self) -> Option<&Actor> {
        match &self.state {
            SessionState::SignedIn { actor, .. } => Some(actor),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<&SelectedPeer> {
        match &self.state {
            SessionState::SignedIn { selected, .. } => selected.as_ref(),
            _ => None,
        }
    }

    /// Conversation key of the selected chat, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        self.selected().map(|p| p.conversation_id.as_str())
    }

    /// `SignedOut -> Authenticating`.
    pub fn begin_authentication(&mut self) -> Result<()> {
        match self.state {
            SessionState::SignedOut => {
                self.state = SessionState::Authenticating;
                Ok(())
            }
            _ => bail!("login attempted while not signed out"),
        }
    }

    /// `Authenticating -> SignedIn`, nothing selected yet.
    pub fn complete_sign_in(&mut self, actor: Actor) -> Result<()> {
        match self.state {
            SessionState::Authenticating => {
                info!("signed in as {} ({})", actor.display_name, actor.id);
                self.state = SessionState::SignedIn {
                    actor,
                    selected: None,
                };
                Ok(())
            }
            _ => bail!("sign-in completed outside an authentication attempt"),
        }
    }

    /// `Authenticating -> SignedOut` after a failed attempt.
    pub fn fail_sign_in(&mut self) {
        if !matches!(self.state, SessionState::Authenticating) {
            warn!("sign-in failure reported outside an authentication attempt");
        }
        self.state = SessionState::SignedOut;
    }

    /// Resume a previously signed-in identity (cached profile), skipping the
    /// authentication round-trip.
    pub fn restore(&mut self, actor: Actor) -> Result<()> {
        match self.state {
            SessionState::SignedOut => {
                info!("restored cached session for {}", actor.id);
                self.state = SessionState::SignedIn {
                    actor,
                    selected: None,
                };
                Ok(())
            }
            _ => bail!("cannot restore a session while one is active"),
        }
    }

    /// Select a peer to talk to; returns the derived conversation key.
    pub fn select_peer(
        &mut self,
        peer_id: &str,
        peer_name: &str,
        peer_photo_url: Option<String>,
    ) -> Result<String> {
        match &mut self.state {
            SessionState::SignedIn { actor, selected } => {
                let cid = conversation_id(&actor.id, peer_id);
                debug!("selected peer {} -> {}", peer_id, cid);
                *selected = Some(SelectedPeer {
                    id: peer_id.to_string(),
                    display_name: peer_name.to_string(),
                    photo_url: peer_photo_url,
                    conversation_id: cid.clone(),
                });
                Ok(cid)
            }
            _ => bail!("cannot select a contact while signed out"),
        }
    }

    pub fn clear_selection(&mut self) {
        if let SessionState::SignedIn { selected, .. } = &mut self.state {
            *selected = None;
        }
    }

    /// Drop to `SignedOut`, handing back the actor that was signed in so the
    /// caller can mark it offline.
    pub fn sign_out(&mut self) -> Option<Actor> {
        let previous = std::mem::replace(&mut self.state, SessionState::SignedOut);
        match previous {
            SessionState::SignedIn { actor, .. } => Some(actor),
            _ => None,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_actor() -> Actor {
        Actor {
            id: "demo_user_1_0".to_string(),
            display_name: "Demo User 1".to_string(),
            photo_url: None,
            is_online: true,
            last_seen_at: None,
        }
    }

    #[test]
    fn login_walks_the_lifecycle() {
        let mut session = SessionStore::new();
        assert!(!session.is_signed_in());

        session.begin_authentication().unwrap();
        assert!(session.begin_authentication().is_err());

        session.complete_sign_in(demo_actor()).unwrap();
        assert!(session.is_signed_in());
        assert!(session.selected().is_none());

        let actor = session.sign_out().unwrap();
        assert_eq!(actor.id, "demo_user_1_0");
        assert!(!session.is_signed_in());
    }

    #[test]
    fn failed_attempt_returns_to_signed_out() {
        let mut session = SessionStore::new();
        session.begin_authentication().unwrap();
        session.fail_sign_in();
        assert_eq!(*session.state(), SessionState::SignedOut);
        // The user can retry immediately.
        assert!(session.begin_authentication().is_ok());
    }

    #[test]
    fn selection_requires_a_session() {
        let mut session = SessionStore::new();
        assert!(session.select_peer("demo_user_2", "Demo User 2", None).is_err());

        session.begin_authentication().unwrap();
        session.complete_sign_in(demo_actor()).unwrap();
        let cid = session.select_peer("demo_user_2", "Demo User 2", None).unwrap();
        assert_eq!(session.conversation_id(), Some(cid.as_str()));

        session.clear_selection();
        assert!(session.selected().is_none());
    }
}
