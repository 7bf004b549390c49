//! Turning a model-supplied link text into a click on a labeled element.

use serde::Deserialize;
use tracing::{debug, info};
use webai_core::{Result, WebAiError};

use crate::annotate::sanitize_label;
use crate::page::Page;

const LABELED_JS: &str = include_str!("js/labeled.js");
const CENTER_JS: &str = include_str!("js/center.js");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Partial,
}

/// Which labeled element a request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Position among the page's labeled elements, in document order.
    pub position: usize,
    pub kind: MatchKind,
}

/// Pick the element to click for `requested` among `labels` (document order).
///
/// An exact match beats a partial (substring) match. Within a kind the
/// last element in document order wins. An empty request never matches.
pub fn choose_target<S: AsRef<str>>(labels: &[S], requested: &str) -> Option<Target> {
    let wanted = sanitize_label(requested);
    if wanted.is_empty() {
        return None;
    }

    let mut exact = None;
    let mut partial = None;
    for (position, label) in labels.iter().enumerate() {
        let label = label.as_ref();
        if label == wanted {
            exact = Some(position);
        } else if label.contains(&wanted) {
            partial = Some(position);
        }
    }

    exact
        .map(|position| Target {
            position,
            kind: MatchKind::Exact,
        })
        .or(partial.map(|position| Target {
            position,
            kind: MatchKind::Partial,
        }))
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

/// Labels currently present on the page, in document order.
pub async fn labeled_texts(page: &Page) -> Result<Vec<String>> {
    let raw = page.evaluate(LABELED_JS).await?;
    Ok(serde_json::from_value(raw)?)
}

/// Click the element labeled `requested`, then let the page settle.
pub async fn click_label(page: &Page, requested: &str) -> Result<()> {
    let labels = labeled_texts(page).await?;
    let target = choose_target(&labels, requested)
        .ok_or_else(|| WebAiError::ElementNotFound(requested.to_string()))?;
    debug!(
        requested,
        label = %labels[target.position],
        kind = ?target.kind,
        "resolved click target"
    );

    let script = CENTER_JS.replace("__INDEX__", &target.position.to_string());
    let raw = page.evaluate(&script).await?;
    let point: Option<Point> = serde_json::from_value(raw)?;
    let point = point.ok_or_else(|| WebAiError::ElementNotFound(requested.to_string()))?;

    let load = page.session().subscribe("Page.loadEventFired");
    page.click_at(point.x, point.y).await?;
    info!(label = requested, x = point.x, y = point.y, "clicked element");
    page.wait_for_load(load).await;
    Ok(())
}
