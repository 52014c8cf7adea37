//! Support case record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted lifecycle state of a support case.
///
/// Only two states are ever stored. A status page that cannot be interpreted
/// classifies as `Unknown` at query time and is never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Open,
    Resolved,
}

impl CaseStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
        }
    }

    /// Parse the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A support case as stored.
///
/// `task_number` is the token the manufacturer portal assigned at submission
/// (`SUP-` followed by alphanumerics). It is unique and immutable; a case
/// that never received one does not exist in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportCase {
    pub id: Uuid,
    pub task_number: String,
    pub user_id: String,
    /// Issue description as the user typed it.
    pub original_text: String,
    /// English rendering used for portal submission.
    pub translated_text: String,
    pub status: CaseStatus,
    /// Present iff `status` is `Resolved`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    /// Set once the 24-hour reminder has been driven through the portal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a case after a successful portal submission.
#[derive(Debug, Clone)]
pub struct NewCase {
    pub task_number: String,
    pub user_id: String,
    pub original_text: String,
    pub translated_text: String,
}

/// An open case joined with its owner's contact details, as returned by
/// [`crate::store::CaseRepository::list_open`].
#[derive(Debug, Clone)]
pub struct OpenCase {
    pub case: SupportCase,
    pub email: String,
    pub username: String,
}

impl OpenCase {
    /// Hours elapsed since the case was created.
    #[must_use]
    pub fn age_hours(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.case.created_at).num_hours()
    }

    /// Read-only view a monitor needs to drive polling and notification.
    #[must_use]
    pub fn snapshot(&self) -> CaseSnapshot {
        CaseSnapshot {
            task_number: self.case.task_number.clone(),
            user_email: self.email.clone(),
            username: self.username.clone(),
        }
    }
}

/// The slice of case state a per-session monitor holds in memory.
///
/// Deliberately excludes `status`: the store is the single source of truth
/// for the open/resolved transition.
#[derive(Debug, Clone)]
pub struct CaseSnapshot {
    pub task_number: String,
    pub user_email: String,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(CaseStatus::parse("open"), Some(CaseStatus::Open));
        assert_eq!(CaseStatus::parse("resolved"), Some(CaseStatus::Resolved));
        assert_eq!(CaseStatus::parse("unknown"), None);
        assert_eq!(CaseStatus::Open.as_str(), "open");
        assert_eq!(CaseStatus::Resolved.as_str(), "resolved");
    }

    #[test]
    fn test_case_json_shape() {
        let case = SupportCase {
            id: Uuid::new_v4(),
            task_number: "SUP-AB12CD34".to_string(),
            user_id: "U1".to_string(),
            original_text: "mower won't charge".to_string(),
            translated_text: "mower won't charge".to_string(),
            status: CaseStatus::Open,
            response_text: None,
            reminder_sent_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&case).unwrap();
        assert_eq!(json["status"], "open");
        assert_eq!(json["task_number"], "SUP-AB12CD34");
        assert!(json.get("response_text").is_none());
    }

    #[test]
    fn test_age_hours() {
        let case = SupportCase {
            id: Uuid::new_v4(),
            task_number: "SUP-TEST1".to_string(),
            user_id: "U1".to_string(),
            original_text: String::new(),
            translated_text: String::new(),
            status: CaseStatus::Open,
            response_text: None,
            reminder_sent_at: None,
            created_at: Utc::now() - chrono::Duration::hours(25),
            updated_at: Utc::now(),
        };
        let open = OpenCase {
            case,
            email: "u1@example.com".to_string(),
            username: "u1".to_string(),
        };
        assert!(open.age_hours(Utc::now()) >= 24);
    }
}
