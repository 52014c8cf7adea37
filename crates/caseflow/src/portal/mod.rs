//! Manufacturer portal access.
//!
//! The portal exposes no API, only web pages. [`BrowserPortal`] drives a
//! headless browser against them and returns structured results; it never
//! interprets status itself. Interpretation lives in [`crate::classify`] so
//! it stays unit-testable without a browser.

pub mod browser;

pub use browser::BrowserPortal;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;

use crate::error::PortalError;

/// A rendered portal page: raw markup plus the visible body text.
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    pub html: String,
    pub text: String,
}

impl RawPage {
    #[must_use]
    pub fn new(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            text: text.into(),
        }
    }

    /// The page's visible text, derived from the markup when the renderer
    /// did not supply it.
    #[must_use]
    pub fn visible_text(&self) -> String {
        if !self.text.trim().is_empty() {
            return self.text.clone();
        }
        let document = Html::parse_document(&self.html);
        document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Interface to the manufacturer portal.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Submit a support case and return the portal-assigned task number.
    async fn submit(&self, user_id: &str, issue_text: &str) -> Result<String, PortalError>;

    /// Look up the status page for a task number. Returns the rendered page;
    /// never interprets it.
    async fn status_page(&self, task_number: &str) -> Result<RawPage, PortalError>;

    /// Trigger a manufacturer-side reminder for a pending case.
    async fn send_reminder(&self, task_number: &str) -> Result<(), PortalError>;
}

/// Extract the first task-number token (`SUP-` followed by alphanumerics)
/// from page markup.
#[must_use]
pub fn find_task_number(html: &str) -> Option<String> {
    let re = Regex::new(r"SUP-[A-Z0-9]+").expect("valid task number pattern");
    re.find(html).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_task_number() {
        let html = r#"<p>Successfully submitted. Your tracking number is SUP-AB12CD34.</p>"#;
        assert_eq!(find_task_number(html), Some("SUP-AB12CD34".to_string()));
        assert_eq!(find_task_number("<p>no token here</p>"), None);
    }

    #[test]
    fn test_visible_text_falls_back_to_markup() {
        let page = RawPage::new("<html><body><p>Status: Open</p></body></html>", "");
        assert!(page.visible_text().contains("Status: Open"));

        let page = RawPage::new("<html></html>", "Rendered text wins");
        assert_eq!(page.visible_text(), "Rendered text wins");
    }
}
