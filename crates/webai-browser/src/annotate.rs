//! Labeling the clickable elements of a page.
//!
//! The in-page script only gathers facts (rects, computed styles). Which
//! elements count as visible and which get a `gpt-link-text` label is
//! decided here, so the rules can be tested without a browser.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use webai_core::{Result, WebAiError};

use crate::page::Page;

/// Attribute carrying an element's label.
pub const LABEL_ATTRIBUTE: &str = "gpt-link-text";

/// Elements narrower or shorter than this (in CSS px) are never labeled.
const MIN_LABEL_SIZE: f64 = 5.0;

const COLLECT_JS: &str = include_str!("js/collect.js");
const APPLY_JS: &str = include_str!("js/apply.js");

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub width: f64,
    pub height: f64,
}

/// The computed-style values that decide visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleFacts {
    pub width: String,
    pub height: String,
    pub opacity: String,
    pub display: String,
    pub visibility: String,
}

impl Default for StyleFacts {
    fn default() -> Self {
        Self {
            width: "auto".into(),
            height: "auto".into(),
            opacity: "1".into(),
            display: "block".into(),
            visibility: "visible".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Everything measured about one candidate element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementFacts {
    /// Position among all candidates, in document order.
    pub index: usize,
    pub tag: String,
    pub text: String,
    pub rect: Rect,
    /// The element's own style first, then each ancestor up to `<html>`.
    pub styles: Vec<StyleFacts>,
}

/// Output of the collection script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFacts {
    pub viewport: Viewport,
    pub elements: Vec<ElementFacts>,
}

/// A candidate element and the label it received, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub index: usize,
    pub tag: String,
    pub label: Option<String>,
}

/// Result of annotating a page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Annotation {
    pub candidates: Vec<Candidate>,
}

impl Annotation {
    /// Labeled candidates in document order.
    pub fn labeled(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.label.is_some())
    }

    pub fn labeled_count(&self) -> usize {
        self.labeled().count()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.labeled().filter_map(|c| c.label.as_deref()).collect()
    }
}

// ─── Rules ──────────────────────────────────────────────────────

/// Computed style does not hide the element.
///
/// `width`/`height` are compared to the literal `"0"`; computed values
/// normally carry a unit, so only `opacity`, `display` and `visibility`
/// usually decide.
pub fn is_style_visible(style: &StyleFacts) -> bool {
    style.width != "0"
        && style.height != "0"
        && style.opacity != "0"
        && style.display != "none"
        && style.visibility != "hidden"
}

/// The rect lies entirely inside the viewport.
pub fn in_viewport(rect: &Rect, viewport: &Viewport) -> bool {
    rect.top >= 0.0
        && rect.left >= 0.0
        && rect.bottom <= viewport.height
        && rect.right <= viewport.width
}

/// The element and all of its ancestors are style-visible and it is on screen.
pub fn is_element_visible(element: &ElementFacts, viewport: &Viewport) -> bool {
    !element.styles.is_empty()
        && element.styles.iter().all(is_style_visible)
        && in_viewport(&element.rect, viewport)
}

pub fn is_labelable(element: &ElementFacts, viewport: &Viewport) -> bool {
    element.rect.width > MIN_LABEL_SIZE
        && element.rect.height > MIN_LABEL_SIZE
        && is_element_visible(element, viewport)
}

/// Keep only ASCII letters, digits and spaces. No trimming.
pub fn sanitize_label(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

/// Decide labels for every candidate.
pub fn decide(facts: &PageFacts) -> Annotation {
    let candidates = facts
        .elements
        .iter()
        .map(|el| Candidate {
            index: el.index,
            tag: el.tag.clone(),
            label: is_labelable(el, &facts.viewport).then(|| sanitize_label(&el.text)),
        })
        .collect();
    Annotation { candidates }
}

// ─── In-page driver ─────────────────────────────────────────────

/// Reset, highlight and label the clickable elements of `page`.
pub async fn annotate(page: &Page) -> Result<Annotation> {
    let raw = page.evaluate(COLLECT_JS).await?;
    let facts: PageFacts = serde_json::from_value(raw)
        .map_err(|e| WebAiError::Script(format!("unexpected annotation facts: {e}")))?;

    let annotation = decide(&facts);

    let labels: Vec<(usize, &str)> = annotation
        .labeled()
        .filter_map(|c| c.label.as_deref().map(|l| (c.index, l)))
        .collect();
    let script = APPLY_JS.replace("__LABELS__", &serde_json::to_string(&labels)?);
    let applied = page.evaluate(&script).await?.as_u64().unwrap_or(0);

    if applied as usize != labels.len() {
        debug!(
            expected = labels.len(),
            applied, "some candidates left the DOM before labeling"
        );
    }
    info!(
        candidates = annotation.candidates.len(),
        labeled = annotation.labeled_count(),
        "annotated page"
    );
    Ok(annotation)
}
