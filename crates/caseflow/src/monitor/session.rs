//! Per-session case monitor.
//!
//! One task per chat session with a pending case. Sleeps, fetches the status
//! page, classifies it, and on resolution runs the notification path gated by
//! the store's conditional update.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::MonitorConfig;
use crate::case::CaseSnapshot;
use crate::classify::{classify, format_resolution_response, Classification};
use crate::notify::{template, ChatSink, NotificationDispatcher};
use crate::portal::Portal;
use crate::store::CaseRepository;

/// Why a session monitor exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The case reached resolved status (whether or not this task won the
    /// conditional update).
    Resolved,
    /// The check cap ran out; the sweep keeps watching the case.
    Expired,
    /// The owning session ended.
    Cancelled,
}

/// Everything a session monitor needs, shared across all monitors.
pub struct SessionDeps {
    pub portal: Arc<dyn Portal>,
    pub repo: Arc<dyn CaseRepository>,
    pub dispatcher: NotificationDispatcher,
    pub chat: Arc<dyn ChatSink>,
    pub config: MonitorConfig,
}

/// Poll one case until it resolves, the check cap runs out, or the
/// session is cancelled.
pub async fn run(
    deps: Arc<SessionDeps>,
    session_id: String,
    snapshot: CaseSnapshot,
    cancel: CancellationToken,
) -> MonitorOutcome {
    let task_number = snapshot.task_number.clone();
    tracing::info!(
        %session_id,
        %task_number,
        max_checks = deps.config.max_checks,
        "starting session monitor"
    );

    for check in 1..=deps.config.max_checks {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(%session_id, %task_number, "session ended, stopping monitor");
                return MonitorOutcome::Cancelled;
            }
            () = tokio::time::sleep(deps.config.poll_interval) => {}
        }

        let page = match deps.portal.status_page(&task_number).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(%task_number, check, error = %e, "status check failed, will retry");
                continue;
            }
        };

        match classify(&page) {
            Classification::Resolved { response_text } => {
                let formatted =
                    format_resolution_response(response_text.as_deref().unwrap_or(""));
                match deps.repo.resolve_if_open(&task_number, &formatted).await {
                    Ok(true) => {
                        tracing::info!(%session_id, %task_number, "case resolved, notifying");
                        let message = template::chat_resolution_message(&task_number, &formatted);
                        if !deps.chat.post(&session_id, &message).await {
                            tracing::warn!(%session_id, "chat session unreachable, email only");
                        }
                        deps.dispatcher
                            .send_resolution_email(
                                &snapshot.user_email,
                                &snapshot.username,
                                &task_number,
                                &formatted,
                            )
                            .await;
                    }
                    Ok(false) => {
                        tracing::debug!(%task_number, "case already resolved by another driver");
                    }
                    Err(e) => {
                        tracing::warn!(%task_number, error = %e, "resolve failed, will retry");
                        continue;
                    }
                }
                return MonitorOutcome::Resolved;
            }
            Classification::Open => {
                tracing::debug!(%task_number, check, "case still open");
            }
            Classification::Unknown => {
                tracing::debug!(%task_number, check, "status unreadable, will retry");
            }
        }
    }

    tracing::info!(%session_id, %task_number, "check cap reached, handing off to sweep");
    MonitorOutcome::Expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::case::CaseStatus;
    use crate::portal::RawPage;
    use crate::store::MemCaseStore;
    use crate::testing::{resolved_page, RecordingChat, RecordingMailer, ScriptedPortal};
    use crate::NewCase;

    struct Harness {
        deps: Arc<SessionDeps>,
        portal: Arc<ScriptedPortal>,
        repo: Arc<MemCaseStore>,
        mailer: Arc<RecordingMailer>,
        chat: Arc<RecordingChat>,
    }

    async fn harness(portal: ScriptedPortal, max_checks: u32) -> Harness {
        let portal = Arc::new(portal);
        let repo = Arc::new(MemCaseStore::new().with_user("U1", "u1@example.com", "alice"));
        repo.create(NewCase {
            task_number: "SUP-AB12CD34".to_string(),
            user_id: "U1".to_string(),
            original_text: "mower stuck in dock".to_string(),
            translated_text: "mower stuck in dock".to_string(),
        })
        .await
        .unwrap();
        let mailer = Arc::new(RecordingMailer::new());
        let chat = Arc::new(RecordingChat::new());
        let deps = Arc::new(SessionDeps {
            portal: portal.clone(),
            repo: repo.clone(),
            dispatcher: NotificationDispatcher::new(mailer.clone()),
            chat: chat.clone(),
            config: MonitorConfig {
                poll_interval: Duration::from_millis(1),
                max_checks,
            },
        });
        Harness {
            deps,
            portal,
            repo,
            mailer,
            chat,
        }
    }

    fn snapshot() -> CaseSnapshot {
        CaseSnapshot {
            task_number: "SUP-AB12CD34".to_string(),
            user_email: "u1@example.com".to_string(),
            username: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_then_resolved_notifies_once() {
        let portal = ScriptedPortal::new()
            .then_open()
            .then_open()
            .then_page(RawPage::new(
                "",
                "Status: Resolved. Response: Please reset the base station.",
            ));
        let h = harness(portal, 10).await;

        let outcome = run(h.deps, "session-1".to_string(), snapshot(), CancellationToken::new())
            .await;

        assert_eq!(outcome, MonitorOutcome::Resolved);
        assert_eq!(h.portal.status_calls(), 3);

        let case = h.repo.find("SUP-AB12CD34").await.unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::Resolved);
        assert_eq!(
            case.response_text.as_deref(),
            Some("Please reset the base station.")
        );

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "u1@example.com");
        assert!(sent[0].html.contains("Please reset the base station."));

        let posts = h.chat.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "session-1");
        assert!(posts[0].1.contains("SUP-AB12CD34"));
    }

    #[tokio::test]
    async fn test_expires_after_check_cap() {
        let h = harness(ScriptedPortal::new().then_open(), 288).await;

        let outcome = run(h.deps, "session-1".to_string(), snapshot(), CancellationToken::new())
            .await;

        assert_eq!(outcome, MonitorOutcome::Expired);
        assert_eq!(h.portal.status_calls(), 288);
        assert!(h.mailer.sent().is_empty());

        let case = h.repo.find("SUP-AB12CD34").await.unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::Open);
    }

    #[tokio::test]
    async fn test_cancellation_stops_monitor_promptly() {
        let portal = Arc::new(ScriptedPortal::new().then_open());
        let repo = Arc::new(MemCaseStore::new().with_user("U1", "u1@example.com", "alice"));
        let mailer = Arc::new(RecordingMailer::new());
        let deps = Arc::new(SessionDeps {
            portal,
            repo,
            dispatcher: NotificationDispatcher::new(mailer.clone()),
            chat: Arc::new(RecordingChat::new()),
            config: MonitorConfig {
                poll_interval: Duration::from_secs(300),
                max_checks: 288,
            },
        });

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            deps,
            "session-1".to_string(),
            snapshot(),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor must exit promptly after cancel")
            .unwrap();
        assert_eq!(outcome, MonitorOutcome::Cancelled);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failures_do_not_kill_monitor() {
        let portal = ScriptedPortal::new()
            .then_unavailable()
            .then_page(RawPage::new("", "Loading..."))
            .then_page(resolved_page("Firmware update pushed to your mower."));
        let h = harness(portal, 10).await;

        let outcome = run(h.deps, "session-1".to_string(), snapshot(), CancellationToken::new())
            .await;

        assert_eq!(outcome, MonitorOutcome::Resolved);
        assert_eq!(h.portal.status_calls(), 3);
        assert_eq!(h.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_no_notification_when_case_already_resolved() {
        let portal = ScriptedPortal::new().then_page(resolved_page("Replaced under warranty."));
        let h = harness(portal, 10).await;
        h.repo
            .resolve_if_open("SUP-AB12CD34", "already handled")
            .await
            .unwrap();

        let outcome = run(h.deps, "session-1".to_string(), snapshot(), CancellationToken::new())
            .await;

        assert_eq!(outcome, MonitorOutcome::Resolved);
        assert!(h.mailer.sent().is_empty());
        assert!(h.chat.posts().is_empty());

        let case = h.repo.find("SUP-AB12CD34").await.unwrap().unwrap();
        assert_eq!(case.response_text.as_deref(), Some("already handled"));
    }

    #[tokio::test]
    async fn test_unreachable_chat_still_sends_email() {
        let portal = Arc::new(
            ScriptedPortal::new().then_page(resolved_page("Battery replacement approved.")),
        );
        let repo = Arc::new(MemCaseStore::new().with_user("U1", "u1@example.com", "alice"));
        repo.create(NewCase {
            task_number: "SUP-AB12CD34".to_string(),
            user_id: "U1".to_string(),
            original_text: "battery drains fast".to_string(),
            translated_text: "battery drains fast".to_string(),
        })
        .await
        .unwrap();
        let mailer = Arc::new(RecordingMailer::new());
        let deps = Arc::new(SessionDeps {
            portal,
            repo,
            dispatcher: NotificationDispatcher::new(mailer.clone()),
            chat: Arc::new(RecordingChat::unreachable()),
            config: MonitorConfig {
                poll_interval: Duration::from_millis(1),
                max_checks: 5,
            },
        });

        let outcome = run(deps, "session-1".to_string(), snapshot(), CancellationToken::new())
            .await;

        assert_eq!(outcome, MonitorOutcome::Resolved);
        assert_eq!(mailer.sent().len(), 1);
    }
}
