//! Browser-driven portal client using chromiumoxide.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::Rng;
use tokio::task::JoinHandle;

use super::{find_task_number, Portal, RawPage};
use crate::error::PortalError;

/// User agent presented to the portal. Matches a mainstream desktop browser
/// so the automation is not trivially distinguishable from a human visitor.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// How often to re-query while waiting for an element or text to appear.
const WAIT_POLL: Duration = Duration::from_millis(250);

/// Deadline for a single element to appear.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for the submission success indicator.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(15);

/// Overall bound on a status lookup. A hung portal must not block a
/// scheduler tick indefinitely.
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);

/// Overall bound on a submission. Generous because the description is typed
/// keystroke by keystroke.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(180);

/// Overall bound on driving the reminder page.
const REMINDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Portal client that drives a real browser.
///
/// Every operation launches its own browser and tears it down on all exit
/// paths. Nothing is reused across calls, so a stale DOM or an expired
/// portal session can only ever affect a single operation.
pub struct BrowserPortal {
    base_url: String,
    headless: bool,
}

impl BrowserPortal {
    #[must_use]
    pub fn new(base_url: impl Into<String>, headless: bool) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headless,
        }
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>), PortalError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--no-sandbox") // Required for containerized environments
            .arg("--disable-dev-shm-usage") // Avoid /dev/shm size issues in containers
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={USER_AGENT}"));
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(|e| PortalError::Unavailable {
            reason: format!("failed to build browser config: {e}"),
        })?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // Spawn handler task
        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok((browser, handle))
    }

    async fn submit_inner(
        &self,
        browser: &Browser,
        user_id: &str,
        issue_text: &str,
    ) -> Result<String, PortalError> {
        let page = browser.new_page(self.base_url.as_str()).await?;
        human_delay(1000, 2000).await;

        let id_input = wait_for_element(
            &page,
            r#"input[placeholder*="user ID"], input[name="userId"], input[type="text"]"#,
            ELEMENT_TIMEOUT,
            "submission identifier input",
        )
        .await?;
        human_type(&id_input, user_id).await?;
        human_delay(300, 600).await;

        let description = wait_for_element(
            &page,
            r#"textarea[placeholder*="describe"], textarea"#,
            ELEMENT_TIMEOUT,
            "submission description input",
        )
        .await?;
        human_type(&description, issue_text).await?;
        human_delay(500, 1000).await;

        let submit = wait_for_element(
            &page,
            r#"button[type="submit"], button"#,
            ELEMENT_TIMEOUT,
            "submit button",
        )
        .await?;
        submit.click().await?;
        human_delay(2000, 3000).await;

        if !wait_for_text(&page, "Successfully", CONFIRM_TIMEOUT).await? {
            return Err(PortalError::SubmissionFailed {
                reason: "success indicator never appeared".to_string(),
            });
        }

        let html = page.content().await?;
        find_task_number(&html).ok_or_else(|| PortalError::SubmissionFailed {
            reason: "no task number token on confirmation page".to_string(),
        })
    }

    async fn status_inner(
        &self,
        browser: &Browser,
        task_number: &str,
    ) -> Result<RawPage, PortalError> {
        let page = browser
            .new_page(format!("{}/status", self.base_url).as_str())
            .await?;
        human_delay(1000, 2000).await;

        // The lookup field and search button are best-effort: some portal
        // variants render the status directly from the query string.
        if let Ok(input) = page
            .find_element(r#"input[placeholder*="task"], input[type="text"]"#)
            .await
        {
            input.click().await?;
            input.type_str(task_number).await?;
            human_delay(300, 600).await;
        }

        if let Ok(button) = page
            .find_element(r#"button[type="submit"], button"#)
            .await
        {
            button.click().await?;
            human_delay(3000, 4000).await;
        }

        let html = page.content().await?;
        let text = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await?
            .into_value::<String>()
            .unwrap_or_default();

        tracing::debug!(task_number, len = html.len(), "fetched status page");
        Ok(RawPage::new(html, text))
    }

    async fn reminder_inner(
        &self,
        browser: &Browser,
        task_number: &str,
    ) -> Result<(), PortalError> {
        let page = browser
            .new_page(format!("{}/reminder", self.base_url).as_str())
            .await?;
        human_delay(1000, 2000).await;

        let input = wait_for_element(
            &page,
            r#"input[placeholder*="task"], input[type="text"]"#,
            ELEMENT_TIMEOUT,
            "reminder task input",
        )
        .await?;
        human_type(&input, task_number).await?;
        human_delay(500, 1000).await;

        let button = wait_for_element(
            &page,
            r#"button[type="submit"], button"#,
            ELEMENT_TIMEOUT,
            "reminder send button",
        )
        .await?;
        button.click().await?;
        human_delay(2000, 3000).await;

        Ok(())
    }
}

#[async_trait]
impl Portal for BrowserPortal {
    async fn submit(&self, user_id: &str, issue_text: &str) -> Result<String, PortalError> {
        tracing::info!(user_id, "submitting support case to portal");
        let (mut browser, handler) = self.launch().await?;

        let result = tokio::time::timeout(
            SUBMIT_TIMEOUT,
            self.submit_inner(&browser, user_id, issue_text),
        )
        .await
        .unwrap_or(Err(PortalError::Timeout { step: "submission" }));

        let _ = browser.close().await;
        let _ = handler.await;

        match &result {
            Ok(task_number) => tracing::info!(%task_number, "portal confirmed submission"),
            Err(e) => tracing::warn!(error = %e, "portal submission failed"),
        }
        result
    }

    async fn status_page(&self, task_number: &str) -> Result<RawPage, PortalError> {
        tracing::debug!(task_number, "looking up case status");
        let (mut browser, handler) = self.launch().await?;

        let result = tokio::time::timeout(
            STATUS_TIMEOUT,
            self.status_inner(&browser, task_number),
        )
        .await
        .unwrap_or(Err(PortalError::Timeout {
            step: "status lookup",
        }));

        let _ = browser.close().await;
        let _ = handler.await;

        result
    }

    async fn send_reminder(&self, task_number: &str) -> Result<(), PortalError> {
        tracing::info!(task_number, "sending portal reminder");
        let (mut browser, handler) = self.launch().await?;

        let result = tokio::time::timeout(
            REMINDER_TIMEOUT,
            self.reminder_inner(&browser, task_number),
        )
        .await
        .unwrap_or(Err(PortalError::Timeout { step: "reminder" }));

        let _ = browser.close().await;
        let _ = handler.await;

        result
    }
}

/// Sleep a randomized human-looking amount of time.
async fn human_delay(min_ms: u64, max_ms: u64) {
    let ms = rand::thread_rng().gen_range(min_ms..=max_ms);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Type text one keystroke at a time with randomized inter-character delays
/// and the occasional longer hesitation.
async fn human_type(element: &Element, text: &str) -> Result<(), PortalError> {
    element.click().await?;
    human_delay(200, 400).await;

    let mut buf = [0u8; 4];
    for ch in text.chars() {
        element.type_str(ch.encode_utf8(&mut buf)).await?;
        let pause = rand::thread_rng().gen_range(50..=150);
        tokio::time::sleep(Duration::from_millis(pause)).await;
        if rand::thread_rng().gen_bool(0.1) {
            human_delay(100, 300).await;
        }
    }
    Ok(())
}

/// Poll for an element until it appears or the deadline passes.
async fn wait_for_element(
    page: &Page,
    selector: &str,
    timeout: Duration,
    step: &'static str,
) -> Result<Element, PortalError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }
        if Instant::now() >= deadline {
            return Err(PortalError::Timeout { step });
        }
        tokio::time::sleep(WAIT_POLL).await;
    }
}

/// Poll the page content until `needle` appears. Returns `false` when the
/// deadline passes without a match.
async fn wait_for_text(
    page: &Page,
    needle: &str,
    timeout: Duration,
) -> Result<bool, PortalError> {
    let deadline = Instant::now() + timeout;
    loop {
        let html = page.content().await?;
        if html.contains(needle) {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(WAIT_POLL).await;
    }
}
