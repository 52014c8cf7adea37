//! Status-page interpretation.
//!
//! Pure text/markup heuristics over a [`RawPage`]; nothing here touches a
//! browser. The heuristics are ordered and degrade gracefully: the portal's
//! markup changes often enough that no single selector can be trusted.

mod extract;

pub use extract::{extract_response, format_resolution_response, FALLBACK_RESPONSE};

use scraper::{Html, Selector};

use crate::portal::RawPage;

/// Three-way interpretation of a status page.
///
/// `Unknown` covers both "token not recognized" and ambiguous pages (most
/// commonly a loading or error state). It is a transient query result and is
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Open,
    Resolved { response_text: Option<String> },
    Unknown,
}

/// Classify a status page.
///
/// Heuristics, in order, first match wins:
/// 1. status badge/label elements whose text contains "resolved"
/// 2. headings containing "resolved"; or "open" with no resolved heading
/// 3. full-page text scan for "resolved", then "open"
/// 4. "not found" / "no results" markers
/// 5. otherwise `Unknown`
///
/// Total over any input, including the empty page.
#[must_use]
pub fn classify(page: &RawPage) -> Classification {
    let text = page.visible_text();
    let lower = text.to_lowercase();

    if page.html.trim().is_empty() && lower.trim().is_empty() {
        return Classification::Unknown;
    }

    let document = Html::parse_document(&page.html);

    if badge_resolved(&document) || heading_resolved(&document) {
        return resolved(page);
    }
    if heading_open(&document) {
        return Classification::Open;
    }

    if lower.contains("resolved") {
        return resolved(page);
    }
    if lower.contains("open") {
        return Classification::Open;
    }

    if lower.contains("not found") || lower.contains("no results") {
        // The portal does not recognize the token. Distinct from "still
        // pending", but both mean "nothing to act on this tick".
        return Classification::Unknown;
    }

    Classification::Unknown
}

fn resolved(page: &RawPage) -> Classification {
    Classification::Resolved {
        response_text: extract_response(page),
    }
}

/// Elements tagged as status indicators by class name.
fn badge_resolved(document: &Html) -> bool {
    let selector = Selector::parse(r#"[class*="status"], [class*="badge"]"#)
        .expect("valid badge selector");
    document.select(&selector).any(|el| {
        let text = el.text().collect::<String>().to_lowercase();
        text.contains("resolved")
    })
}

fn heading_resolved(document: &Html) -> bool {
    heading_texts(document)
        .iter()
        .any(|t| t.contains("resolved"))
}

/// A heading says "open" and no heading anywhere says "resolved".
fn heading_open(document: &Html) -> bool {
    let headings = heading_texts(document);
    headings.iter().any(|t| t.contains("open"))
        && !headings.iter().any(|t| t.contains("resolved"))
}

fn heading_texts(document: &Html) -> Vec<String> {
    let selector = Selector::parse("h1, h2, h3, h4").expect("valid heading selector");
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().to_lowercase())
        .collect()
}
