//! Support-case lifecycle engine for a manufacturer portal with no API.
//!
//! This crate provides:
//! - Browser automation for case submission, status lookup and reminders
//! - Heuristic status-page classification and response extraction
//! - A Postgres case store whose conditional open→resolved update gates
//!   notifications to at-most-once
//! - Per-session monitors plus a global sweep over all open cases
//! - Email (and in-chat) resolution notifications

pub mod case;
pub mod classify;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod portal;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use case::{CaseSnapshot, CaseStatus, NewCase, OpenCase, SupportCase};
pub use classify::{classify, format_resolution_response, Classification};
pub use config::{EngineConfig, SmtpConfig};
pub use error::{NotifyError, PortalError, StoreError};
pub use monitor::{MonitorConfig, MonitorOutcome, MonitorRegistry, SessionDeps, Sweeper};
pub use notify::{ChatSink, Mailer, NotificationDispatcher, SmtpMailer};
pub use portal::{BrowserPortal, Portal, RawPage};
pub use store::{CaseRepository, MemCaseStore, PgCaseStore};
