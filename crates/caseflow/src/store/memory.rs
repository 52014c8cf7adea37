//! In-memory case store.
//!
//! Same compare-and-swap semantics as the Postgres store, behind a mutex.
//! Used by the test suite and handy for local runs without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::CaseRepository;
use crate::case::{CaseStatus, NewCase, OpenCase, SupportCase};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Contact {
    email: String,
    username: String,
}

#[derive(Default)]
struct Inner {
    cases: HashMap<String, SupportCase>,
    contacts: HashMap<String, Contact>,
}

/// Mutex-guarded in-memory store.
#[derive(Default)]
pub struct MemCaseStore {
    inner: Mutex<Inner>,
}

impl MemCaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user so `list_open` can join contact details.
    #[must_use]
    pub fn with_user(self, user_id: &str, email: &str, username: &str) -> Self {
        {
            let mut inner = self.inner.lock().expect("store lock");
            inner.contacts.insert(
                user_id.to_string(),
                Contact {
                    email: email.to_string(),
                    username: username.to_string(),
                },
            );
        }
        self
    }

    /// Rewrite a case's creation time. Test helper for age-based policies.
    pub fn backdate(&self, task_number: &str, created_at: DateTime<Utc>) {
        let mut inner = self.inner.lock().expect("store lock");
        if let Some(case) = inner.cases.get_mut(task_number) {
            case.created_at = created_at;
        }
    }
}

#[async_trait]
impl CaseRepository for MemCaseStore {
    async fn create(&self, case: NewCase) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        if inner.cases.contains_key(&case.task_number) {
            return Err(StoreError::DuplicateTaskNumber(case.task_number));
        }
        let id = Uuid::new_v4();
        let now = Utc::now();
        inner.cases.insert(
            case.task_number.clone(),
            SupportCase {
                id,
                task_number: case.task_number,
                user_id: case.user_id,
                original_text: case.original_text,
                translated_text: case.translated_text,
                status: CaseStatus::Open,
                response_text: None,
                reminder_sent_at: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn resolve_if_open(
        &self,
        task_number: &str,
        response_text: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        match inner.cases.get_mut(task_number) {
            Some(case) if case.status == CaseStatus::Open => {
                case.status = CaseStatus::Resolved;
                case.response_text = Some(response_text.to_string());
                case.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_open(&self) -> Result<Vec<OpenCase>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let mut open: Vec<OpenCase> = inner
            .cases
            .values()
            .filter(|c| c.status == CaseStatus::Open)
            .filter_map(|c| {
                let contact = inner.contacts.get(&c.user_id)?;
                Some(OpenCase {
                    case: c.clone(),
                    email: contact.email.clone(),
                    username: contact.username.clone(),
                })
            })
            .collect();
        open.sort_by_key(|c| c.case.created_at);
        Ok(open)
    }

    async fn mark_reminder_sent(&self, task_number: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        if let Some(case) = inner.cases.get_mut(task_number) {
            case.reminder_sent_at = Some(Utc::now());
            case.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find(&self, task_number: &str) -> Result<Option<SupportCase>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.cases.get(task_number).cloned())
    }
}
