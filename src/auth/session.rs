//! Session state for the admin gate

use crate::lifecycle::Notice;

/// Password prompt buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordPrompt {
    /// Whether the prompt is shown
    pub open: bool,

    /// What has been typed so far
    pub candidate: String,
}

impl PasswordPrompt {
    /// Hide the prompt and forget the typed text
    pub fn reset(&mut self) {
        self.open = false;
        self.candidate.clear();
    }
}

/// Process-local session data. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Whether the shared password has been entered
    pub authenticated: bool,

    /// The password prompt
    pub prompt: PasswordPrompt,

    /// Last failure shown to the user
    pub notice: Option<Notice>,
}
