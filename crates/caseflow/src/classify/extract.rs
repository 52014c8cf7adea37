//! Response-text extraction and cleanup for resolved cases.

use regex::Regex;
use scraper::{Html, Selector};

use crate::portal::RawPage;

/// Canned message substituted when no usable response text can be captured.
/// Extraction never blocks the resolved classification; the user is told the
/// case is closed even if the content could not be read.
pub const FALLBACK_RESPONSE: &str = "Your support case has been resolved. Our team has addressed \
    your issue. For detailed information, please check your email or contact us directly.";

/// Labels that precede the support team's answer on the status page.
const RESPONSE_LABELS: [&str; 2] = ["support team response", "response:"];

const DATE_ANCHOR: &str = r"(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}\s+at\s+\d{1,2}:\d{2}\s*[AP]M";

/// Extract the support team's response from a resolved status page.
///
/// Layered, most-structured first:
/// 1. a response block identified by class name, taking its message paragraph
/// 2. text following a response label ("Support Team Response", "Response:")
/// 3. text following a date anchor ("January 5, 2026 at 3:12 PM ...")
/// 4. the whole visible page text
#[must_use]
pub fn extract_response(page: &RawPage) -> Option<String> {
    let text = page.visible_text();

    structured_block(&page.html)
        .or_else(|| labeled_response(&text))
        .or_else(|| date_anchored(&text))
        .or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
}

/// Look for a response container by class name and pick the message
/// paragraph out of it (skipping timestamp paragraphs).
fn structured_block(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let container_selector =
        Selector::parse(r#"[class*="response"]"#).expect("valid response selector");
    let paragraph_selector = Selector::parse("p").expect("valid paragraph selector");
    let date_re = Regex::new(DATE_ANCHOR).expect("valid date pattern");

    let container = document.select(&container_selector).next()?;

    let message = container
        .select(&paragraph_selector)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty() && !date_re.is_match(t))
        .max_by_key(String::len);

    match message {
        Some(m) => Some(m),
        None => {
            let whole = container.text().collect::<String>().trim().to_string();
            if whole.is_empty() {
                None
            } else {
                Some(whole)
            }
        }
    }
}

/// Take the text that follows a known response label.
fn labeled_response(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    for label in RESPONSE_LABELS {
        if let Some(idx) = lower.find(label) {
            let after = text[idx + label.len()..]
                .trim_start_matches([':', ' ', '\n', '\t'])
                .trim();
            if !after.is_empty() {
                return Some(after.to_string());
            }
        }
    }
    None
}

/// Take the text that follows a "Month D, YYYY at H:MM AM/PM" timestamp.
fn date_anchored(text: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?s){DATE_ANCHOR}\s*(.+)$")).expect("valid date pattern");
    let captured = re.captures(text)?.get(1)?.as_str().trim();
    if captured.is_empty() {
        None
    } else {
        Some(captured.to_string())
    }
}

/// Clean raw extracted text into something presentable.
///
/// Strips portal chrome and URLs, collapses whitespace, capitalizes the
/// first letter and ensures terminal punctuation. Implausibly short results
/// are replaced with [`FALLBACK_RESPONSE`]. Idempotent: applying it twice
/// yields the same result as once.
#[must_use]
pub fn format_resolution_response(raw: &str) -> String {
    let nav_re =
        Regex::new(r"Submit Case\s+Check Status\s+Reminder\s+Admin").expect("valid nav pattern");
    let search_re =
        Regex::new(r"Search\s+Current Status\s+Task Number").expect("valid search pattern");
    let footer_re = Regex::new(r"(?s)©.*$").expect("valid footer pattern");
    let url_re = Regex::new(r"https?://\S+").expect("valid url pattern");
    let space_re = Regex::new(r"\s+").expect("valid whitespace pattern");

    let mut clean = raw.to_string();
    clean = nav_re.replace_all(&clean, "").into_owned();
    clean = search_re.replace_all(&clean, "").into_owned();
    clean = footer_re.replace_all(&clean, "").into_owned();
    clean = url_re.replace_all(&clean, "").into_owned();
    clean = space_re.replace_all(&clean, " ").trim().to_string();

    if clean.chars().count() < 20 {
        return FALLBACK_RESPONSE.to_string();
    }

    let mut chars = clean.chars();
    if let Some(first) = chars.next() {
        if first.is_lowercase() {
            clean = first.to_uppercase().collect::<String>() + chars.as_str();
        }
    }

    if !clean.ends_with(['.', '!', '?']) {
        clean.push('.');
    }

    clean
}
