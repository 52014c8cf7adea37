//! Shared test doubles and page fixtures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{NotifyError, PortalError};
use crate::notify::{ChatSink, Mailer};
use crate::portal::{Portal, RawPage};

#[derive(Clone)]
enum Step {
    Page(RawPage),
    Unavailable,
}

/// Portal double that replays a scripted sequence of status pages.
///
/// The last step repeats forever, so a single `then_open()` yields an
/// endlessly-open case. Reminders are recorded.
#[derive(Default)]
pub struct ScriptedPortal {
    steps: Mutex<VecDeque<Step>>,
    status_calls: AtomicU32,
    reminders: Mutex<Vec<String>>,
}

impl ScriptedPortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_page(self, page: RawPage) -> Self {
        self.steps
            .lock()
            .expect("script lock")
            .push_back(Step::Page(page));
        self
    }

    pub fn then_open(self) -> Self {
        let page = open_page();
        self.then_page(page)
    }

    pub fn then_unavailable(self) -> Self {
        self.steps
            .lock()
            .expect("script lock")
            .push_back(Step::Unavailable);
        self
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn reminders(&self) -> Vec<String> {
        self.reminders.lock().expect("script lock").clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().expect("script lock");
        if steps.len() > 1 {
            steps.pop_front().expect("non-empty script")
        } else {
            steps
                .front()
                .cloned()
                .unwrap_or_else(|| Step::Page(loading_page()))
        }
    }
}

#[async_trait]
impl Portal for ScriptedPortal {
    async fn submit(&self, _user_id: &str, _issue_text: &str) -> Result<String, PortalError> {
        Ok("SUP-AB12CD34".to_string())
    }

    async fn status_page(&self, _task_number: &str) -> Result<RawPage, PortalError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_step() {
            Step::Page(page) => Ok(page),
            Step::Unavailable => Err(PortalError::Unavailable {
                reason: "scripted outage".to_string(),
            }),
        }
    }

    async fn send_reminder(&self, task_number: &str) -> Result<(), PortalError> {
        self.reminders
            .lock()
            .expect("script lock")
            .push(task_number.to_string());
        Ok(())
    }
}

/// One email captured by [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Mailer double that captures sends, or fails every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mail lock").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Other("smtp unavailable".to_string()));
        }
        self.sent.lock().expect("mail lock").push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
            text: text_body.to_string(),
        });
        Ok(())
    }
}

/// Chat double that records posts; may simulate a dead session.
#[derive(Default)]
pub struct RecordingChat {
    posts: Mutex<Vec<(String, String)>>,
    unreachable: bool,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            unreachable: true,
        }
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().expect("chat lock").clone()
    }
}

#[async_trait]
impl ChatSink for RecordingChat {
    async fn post(&self, session_id: &str, message: &str) -> bool {
        if self.unreachable {
            return false;
        }
        self.posts
            .lock()
            .expect("chat lock")
            .push((session_id.to_string(), message.to_string()));
        true
    }
}

/// Status page for a case that is still being worked.
pub fn open_page() -> RawPage {
    RawPage::new(
        r#"<html><body>
            <h2>Case Status</h2>
            <span class="status-badge">Open</span>
            <p>Your case is being reviewed by our support team.</p>
        </body></html>"#,
        "Case Status Open Your case is being reviewed by our support team.",
    )
}

/// Status page for a resolved case carrying a support-team response.
pub fn resolved_page(response: &str) -> RawPage {
    let html = format!(
        r#"<html><body>
            <h2>Case Status</h2>
            <span class="status-badge">Resolved</span>
            <div class="response-card">
                <h3>Support Team Response</h3>
                <p>{response}</p>
            </div>
        </body></html>"#
    );
    let text = format!("Case Status Resolved Support Team Response {response}");
    RawPage::new(html, text)
}

/// A page whose content gives no status signal.
pub fn loading_page() -> RawPage {
    RawPage::new("<html><body><p>Loading...</p></body></html>", "Loading...")
}
