//! Global open-case sweep.
//!
//! Runs for the life of the process and checks every open case on a fixed
//! interval, independent of chat sessions. Also owns the reminder policy for
//! cases that have been open too long.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::case::OpenCase;
use crate::classify::{classify, format_resolution_response, Classification};
use crate::config::{DEFAULT_REMINDER_AFTER_HOURS, DEFAULT_SWEEP_INTERVAL_SECS};
use crate::notify::NotificationDispatcher;
use crate::portal::Portal;
use crate::store::CaseRepository;

/// Sweep tuning.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Pause between full passes over the open set.
    pub interval: Duration,
    /// Open-case age at which a portal reminder is sent.
    pub reminder_after: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            reminder_after: Duration::from_secs(DEFAULT_REMINDER_AFTER_HOURS * 3600),
        }
    }
}

/// Counters for one sweep pass.
#[derive(Debug, Default)]
pub struct SweepStats {
    pub checked: usize,
    pub resolved: usize,
    pub reminders: usize,
    pub errors: Vec<String>,
}

/// Periodic checker for all open cases.
pub struct Sweeper {
    portal: Arc<dyn Portal>,
    repo: Arc<dyn CaseRepository>,
    dispatcher: NotificationDispatcher,
    config: SweepConfig,
}

impl Sweeper {
    #[must_use]
    pub fn new(
        portal: Arc<dyn Portal>,
        repo: Arc<dyn CaseRepository>,
        dispatcher: NotificationDispatcher,
        config: SweepConfig,
    ) -> Self {
        Self {
            portal,
            repo,
            dispatcher,
            config,
        }
    }

    /// Sweep on the configured interval until shutdown. The first pass runs
    /// immediately so restarts pick up stranded cases without delay.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("sweep shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// One pass over all open cases. A failure on one case never blocks the
    /// rest of the pass.
    pub async fn sweep_once(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        let cases = match self.repo.list_open().await {
            Ok(cases) => cases,
            Err(e) => {
                tracing::warn!(error = %e, "could not list open cases, skipping pass");
                stats.errors.push(format!("list_open: {e}"));
                return stats;
            }
        };

        tracing::debug!(open = cases.len(), "sweeping open cases");
        for case in &cases {
            if let Err(e) = self.check_case(case, &mut stats).await {
                tracing::warn!(
                    task_number = %case.case.task_number,
                    error = %e,
                    "case check failed"
                );
                stats.errors.push(format!("{}: {e}", case.case.task_number));
            }
        }

        tracing::info!(
            checked = stats.checked,
            resolved = stats.resolved,
            reminders = stats.reminders,
            errors = stats.errors.len(),
            "sweep pass complete"
        );
        stats
    }

    async fn check_case(&self, open: &OpenCase, stats: &mut SweepStats) -> anyhow::Result<()> {
        stats.checked += 1;
        let task_number = &open.case.task_number;

        let page = self.portal.status_page(task_number).await?;
        match classify(&page) {
            Classification::Resolved { response_text } => {
                let formatted =
                    format_resolution_response(response_text.as_deref().unwrap_or(""));
                if self.repo.resolve_if_open(task_number, &formatted).await? {
                    tracing::info!(%task_number, "sweep resolved case, notifying by email");
                    self.dispatcher
                        .send_resolution_email(&open.email, &open.username, task_number, &formatted)
                        .await;
                    stats.resolved += 1;
                }
            }
            Classification::Open => {
                if self.reminder_due(open) {
                    self.portal.send_reminder(task_number).await?;
                    self.repo.mark_reminder_sent(task_number).await?;
                    stats.reminders += 1;
                    tracing::info!(%task_number, "reminder sent for aging case");
                }
            }
            Classification::Unknown => {
                tracing::debug!(%task_number, "status unreadable, will retry next pass");
            }
        }
        Ok(())
    }

    // Reminders go out once per case, on the first pass that sees it old
    // enough.
    fn reminder_due(&self, open: &OpenCase) -> bool {
        if open.case.reminder_sent_at.is_some() {
            return false;
        }
        let threshold = chrono::Duration::from_std(self.config.reminder_after)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        Utc::now().signed_duration_since(open.case.created_at) >= threshold
    }
}
