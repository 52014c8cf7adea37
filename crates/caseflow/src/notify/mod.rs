//! Resolution notifications.
//!
//! Email is the guaranteed channel: every resolved case produces exactly one
//! send attempt, authorized by the store's conditional update. The chat
//! channel is best-effort and only used while the owning session is live.

pub mod email;
pub mod template;

pub use email::SmtpMailer;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::NotifyError;

/// Mail transport seam.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), NotifyError>;
}

/// Live chat channel seam, implemented by the chat/agent layer.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Post a message into a chat session. Returns `false` when the session
    /// is no longer reachable; that is tolerated, not an error.
    async fn post(&self, session_id: &str, message: &str) -> bool;
}

/// Formats and sends resolution notifications.
///
/// Sending never throws: a failure is logged and reported as `false`. The
/// store transition is not rolled back on email failure and the send is not
/// retried; status stays monotonic and the gap is an operator concern.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Send the resolution email for a case. Returns whether the transport
    /// accepted it.
    pub async fn send_resolution_email(
        &self,
        email: &str,
        username: &str,
        task_number: &str,
        response_text: &str,
    ) -> bool {
        let subject = format!("Your Support Case {task_number} Has Been Resolved");
        let html = template::resolution_email_html(username, task_number, response_text);
        let text = template::resolution_email_text(username, task_number, response_text);

        match self.mailer.send(email, &subject, &html, &text).await {
            Ok(()) => {
                tracing::info!(task_number, to = email, "resolution email sent");
                true
            }
            Err(e) => {
                tracing::error!(
                    task_number,
                    to = email,
                    error = %e,
                    "failed to send resolution email; case stays resolved, no retry"
                );
                false
            }
        }
    }
}
