// Error taxonomy for the backend seam.
// Every variant is locally recoverable: auth errors re-enable the login
// affordance, feed errors replace the affected pane with a placeholder,
// write errors leave the compose input untouched for a manual retry.

use thiserror::Error;

/// Sign-in failures, keyed by cause so the UI can show a one-line message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("Popup blocked by browser. Please allow popups for this site.")]
    PopupBlocked,
    #[error("Network error. Please check your internet connection.")]
    NetworkFailure,
    #[error("Login popup was closed. Please try again.")]
    UserCancelled,
    #[error("Login failed: {0}")]
    Unknown(String),
}

/// Live-feed failures. No automatic retry; the user refreshes explicitly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error("backend unreachable")]
    Unreachable,
    #[error("permission denied")]
    PermissionDenied,
    #[error("feed error: {0}")]
    Unknown(String),
}

/// Append/update failures on the backend write path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    #[error("backend unreachable")]
    Unreachable,
    #[error("write failed: {0}")]
    Unknown(String),
}
