//! Error types for the case engine.

use thiserror::Error;

/// Errors from portal browser automation.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The portal never confirmed the submission, or no task-number token
    /// was found on the confirmation page. No case exists; the caller (or
    /// the user) decides whether to retry.
    #[error("portal did not confirm submission: {reason}")]
    SubmissionFailed { reason: String },

    /// Navigation or automation failure. Transient from the engine's point
    /// of view: monitors treat it as "try again next tick".
    #[error("portal unavailable: {reason}")]
    Unavailable { reason: String },

    /// A bounded automation step overran its deadline.
    #[error("portal step timed out: {step}")]
    Timeout { step: &'static str },
}

impl From<chromiumoxide::error::CdpError> for PortalError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        Self::Unavailable {
            reason: e.to_string(),
        }
    }
}

/// Errors from the case store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A case with this task number already exists. Task numbers are
    /// assigned by the portal and globally unique, so this indicates a
    /// programming or data error; the create call fails outright.
    #[error("task number already exists: {0}")]
    DuplicateTaskNumber(String),

    /// A stored status column held something other than open/resolved.
    #[error("invalid status value in store: {0}")]
    InvalidStatus(String),

    /// Underlying database failure. Surfaced to the caller, never retried
    /// internally.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors from the notification transport.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("{0}")]
    Other(String),
}
