//! Admin gate
//!
//! A single shared password unlocks the mutation controls for this process.
//! This is an honor-system gate for a single-admin personal site, not a
//! security boundary: the secret and the check both live in the client, and
//! the remote store has to enforce its own access rules.

mod session;

use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Error;
use crate::lifecycle::{Notice, NoticeKind};

pub use session::*;

/// Shared admin session, handed to every lifecycle manager.
///
/// Cloning is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct AdminSession {
    /// The shared secret. Empty means no admin can log in.
    secret: Arc<str>,

    /// The current session
    state: Arc<Mutex<SessionState>>,
}

impl AdminSession {
    /// Create a logged-out session checking against `secret`
    pub fn new(secret: &str) -> Self {
        if secret.is_empty() {
            warn!("no admin password configured; admin login is disabled");
        }
        Self {
            secret: Arc::from(secret),
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the admin password has been entered
    pub fn is_authenticated(&self) -> bool {
        self.lock().authenticated
    }

    /// Fail with [`Error::Unauthorized`] unless authenticated
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    /// Show the password prompt
    pub fn open_prompt(&self) {
        self.lock().prompt.open = true;
    }

    /// Hide the password prompt, discarding what was typed
    pub fn close_prompt(&self) {
        self.lock().prompt.reset();
    }

    /// Whether the password prompt is shown
    pub fn is_prompt_open(&self) -> bool {
        self.lock().prompt.open
    }

    /// Replace the prompt's candidate buffer
    pub fn set_candidate(&self, candidate: &str) {
        self.lock().prompt.candidate = candidate.to_string();
    }

    /// Current contents of the candidate buffer
    pub fn candidate(&self) -> String {
        self.lock().prompt.candidate.clone()
    }

    /// Submit the candidate buffer
    pub fn submit(&self) -> Result<(), Error> {
        let candidate = self.candidate();
        self.submit_password(&candidate)
    }

    /// Compare `candidate` with the shared secret.
    ///
    /// On a match the session becomes authenticated and the prompt is closed
    /// and cleared. On a mismatch a notice is recorded and nothing else changes.
    pub fn submit_password(&self, candidate: &str) -> Result<(), Error> {
        let mut state = self.lock();

        if !self.secret.is_empty() && candidate == &*self.secret {
            if !state.authenticated {
                info!("admin session started");
            }
            state.authenticated = true;
            state.prompt.reset();
            state.notice = None;
            return Ok(());
        }

        warn!("rejected admin password attempt");
        let error = Error::authentication("incorrect password");
        state.notice = Some(Notice::new(NoticeKind::Authentication, "Incorrect password"));
        Err(error)
    }

    /// End the admin session
    pub fn logout(&self) {
        let mut state = self.lock();
        if state.authenticated {
            info!("admin session ended");
        }
        *state = SessionState::default();
    }

    /// Last failure notice, if any
    pub fn notice(&self) -> Option<Notice> {
        self.lock().notice.clone()
    }

    /// Clear the failure notice
    pub fn dismiss_notice(&self) {
        self.lock().notice = None;
    }
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
