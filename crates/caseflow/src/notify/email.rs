//! SMTP mailer using lettre.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::Mailer;
use crate::config::SmtpConfig;
use crate::error::NotifyError;

/// Mailer over an authenticated STARTTLS relay.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Create from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(SmtpConfig::from_env()?))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );
        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
                .port(self.config.port)
                .credentials(creds)
                .build(),
        )
    }

    /// Send a simple test email to verify configuration.
    pub async fn send_test(&self) -> Result<(), NotifyError> {
        let html = "<p>Caseflow SMTP configuration is working.</p>";
        let text = "Caseflow SMTP configuration is working.";
        self.send(
            &self.config.from_email.clone(),
            "Caseflow - Test Email",
            html,
            text,
        )
        .await
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), NotifyError> {
        let from: Mailbox = self.config.from_email.parse()?;
        let to: Mailbox = to.parse()?;

        // Multipart message with both HTML and plain text
        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.transport()?.send(email).await?;
        Ok(())
    }
}
