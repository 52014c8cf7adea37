//! Case polling drivers.
//!
//! Two independent drivers poll the portal over the same store:
//! a per-session monitor (bounded lifetime, immediate in-chat feedback) and
//! a global sweep (process lifetime, catches cases whose session ended).
//! They may race on the same case; the store's conditional update decides
//! which one gets to notify.

pub mod session;
pub mod sweep;

pub use session::{run as run_session_monitor, MonitorOutcome, SessionDeps};
pub use sweep::{SweepConfig, SweepStats, Sweeper};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::case::CaseSnapshot;
use crate::config::{DEFAULT_MAX_CHECKS, DEFAULT_POLL_INTERVAL_SECS};

/// Per-session monitor tuning.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sleep between status checks.
    pub poll_interval: Duration,
    /// Absolute liveness bound: the monitor exits after this many checks
    /// even if nothing else stops it.
    pub max_checks: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_checks: DEFAULT_MAX_CHECKS,
        }
    }
}

struct Entry {
    generation: u64,
    token: CancellationToken,
    #[allow(dead_code)] // retained so the task can be joined or aborted later
    task: JoinHandle<MonitorOutcome>,
}

/// Supervised registry of per-session monitors.
///
/// Owns the session→task association outright; collaborators only get
/// `start` and `cancel`. A monitor deregisters itself when it exits for any
/// reason, so the map never accumulates dead entries.
pub struct MonitorRegistry {
    deps: Arc<SessionDeps>,
    monitors: Arc<Mutex<HashMap<String, Entry>>>,
    next_generation: AtomicU64,
}

impl MonitorRegistry {
    #[must_use]
    pub fn new(deps: Arc<SessionDeps>) -> Self {
        Self {
            deps,
            monitors: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Start monitoring a case for a chat session. A monitor already
    /// registered under this session is cancelled and replaced.
    pub fn start(&self, session_id: &str, snapshot: CaseSnapshot) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let task = {
            let deps = self.deps.clone();
            let monitors = self.monitors.clone();
            let session_id = session_id.to_string();
            let token = token.clone();
            tokio::spawn(async move {
                let outcome =
                    session::run(deps, session_id.clone(), snapshot, token).await;
                let mut map = monitors.lock().expect("monitor map lock");
                if map.get(&session_id).is_some_and(|e| e.generation == generation) {
                    map.remove(&session_id);
                }
                outcome
            })
        };

        let mut map = self.monitors.lock().expect("monitor map lock");
        if let Some(old) = map.insert(
            session_id.to_string(),
            Entry {
                generation,
                token,
                task,
            },
        ) {
            tracing::debug!(session_id, "replacing existing monitor for session");
            old.token.cancel();
        }
    }

    /// Cancel the monitor for a session, if any. An in-flight portal call
    /// finishes or times out naturally before the task observes this.
    pub fn cancel(&self, session_id: &str) {
        let removed = {
            let mut map = self.monitors.lock().expect("monitor map lock");
            map.remove(session_id)
        };
        if let Some(entry) = removed {
            entry.token.cancel();
            tracing::info!(session_id, "cancelled session monitor");
        }
    }

    /// Number of live monitors.
    #[must_use]
    pub fn active(&self) -> usize {
        self.monitors.lock().expect("monitor map lock").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationDispatcher;
    use crate::store::{CaseRepository, MemCaseStore};
    use crate::testing::{resolved_page, RecordingChat, RecordingMailer, ScriptedPortal};
    use crate::NewCase;

    fn snapshot() -> CaseSnapshot {
        CaseSnapshot {
            task_number: "SUP-AB12CD34".to_string(),
            user_email: "u1@example.com".to_string(),
            username: "alice".to_string(),
        }
    }

    async fn deps(portal: ScriptedPortal, poll: Duration) -> Arc<SessionDeps> {
        let repo = Arc::new(MemCaseStore::new().with_user("U1", "u1@example.com", "alice"));
        repo.create(NewCase {
            task_number: "SUP-AB12CD34".to_string(),
            user_id: "U1".to_string(),
            original_text: "mower won't charge".to_string(),
            translated_text: "mower won't charge".to_string(),
        })
        .await
        .unwrap();
        Arc::new(SessionDeps {
            portal: Arc::new(portal),
            repo,
            dispatcher: NotificationDispatcher::new(Arc::new(RecordingMailer::new())),
            chat: Arc::new(RecordingChat::new()),
            config: MonitorConfig {
                poll_interval: poll,
                max_checks: 10,
            },
        })
    }

    #[tokio::test]
    async fn test_cancel_removes_registry_entry() {
        let deps = deps(ScriptedPortal::new().then_open(), Duration::from_secs(30)).await;
        let registry = MonitorRegistry::new(deps);

        registry.start("session-1", snapshot());
        assert_eq!(registry.active(), 1);

        registry.cancel("session-1");
        assert_eq!(registry.active(), 0);
    }

    #[tokio::test]
    async fn test_monitor_deregisters_itself_on_resolve() {
        let portal = ScriptedPortal::new().then_page(resolved_page("All fixed, enjoy your mower."));
        let deps = deps(portal, Duration::from_millis(1)).await;
        let registry = MonitorRegistry::new(deps);

        registry.start("session-1", snapshot());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(registry.active(), 0);
    }

    #[tokio::test]
    async fn test_restart_replaces_monitor_for_session() {
        let deps = deps(ScriptedPortal::new().then_open(), Duration::from_secs(30)).await;
        let registry = MonitorRegistry::new(deps);

        registry.start("session-1", snapshot());
        registry.start("session-1", snapshot());
        assert_eq!(registry.active(), 1);

        registry.cancel("session-1");
        assert_eq!(registry.active(), 0);
    }
}
