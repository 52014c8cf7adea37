//! Case persistence.
//!
//! The store is the single source of truth for case state. The open→resolved
//! transition is a conditional update: callers must gate every resolution
//! side effect (email, chat message) on the returned `updated` flag, which is
//! what makes notification at-most-once even when two pollers race.

pub mod memory;
pub mod postgres;

pub use memory::MemCaseStore;
pub use postgres::PgCaseStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::case::{NewCase, OpenCase, SupportCase};
use crate::error::StoreError;

/// Storage interface for support cases.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Insert a new case with status open. Fails with
    /// [`StoreError::DuplicateTaskNumber`] when the task number exists.
    async fn create(&self, case: NewCase) -> Result<Uuid, StoreError>;

    /// Transition a case from open to resolved, recording the response text.
    ///
    /// Returns whether the row actually changed. A case that is already
    /// resolved is left untouched and reports `false`; status never moves
    /// back to open.
    async fn resolve_if_open(
        &self,
        task_number: &str,
        response_text: &str,
    ) -> Result<bool, StoreError>;

    /// All open cases, each joined with the owner's contact details.
    async fn list_open(&self) -> Result<Vec<OpenCase>, StoreError>;

    /// Record that the portal reminder for this case has been sent.
    async fn mark_reminder_sent(&self, task_number: &str) -> Result<(), StoreError>;

    /// Look up a single case by task number.
    async fn find(&self, task_number: &str) -> Result<Option<SupportCase>, StoreError>;
}
