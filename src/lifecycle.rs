//! State shared by the post and gauge lifecycle managers

use crate::error::Error;

/// Where a lifecycle manager is in its create/edit/delete flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    /// The create form is open
    FormOpen,
    /// The edit form is open for an existing record
    EditOpen,
    /// A create or update call is in flight
    Submitting,
    /// A delete is waiting for confirmation
    DeletePending,
}

/// Category of a user-visible notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// A required field was empty or an input was unusable
    Validation,
    /// The admin password did not match
    Authentication,
    /// The remote store failed the call
    Remote,
}

/// A message the view should surface to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Notice for an error, or `None` for silent refusals
    pub fn for_error(error: &Error) -> Option<Self> {
        let kind = match error {
            Error::Unauthorized => return None,
            Error::Authentication(_) => NoticeKind::Authentication,
            Error::Validation(_) | Error::Image(_) | Error::Io(_) | Error::Config(_) => {
                NoticeKind::Validation
            }
            _ => NoticeKind::Remote,
        };
        Some(Self::new(kind, error.to_string()))
    }
}

/// Record awaiting delete confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: String,
    /// Shown in the confirmation prompt
    pub title: String,
}

/// Trim a required text field, failing when nothing is left
pub(crate) fn required(field: &str, value: &str) -> Result<String, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
