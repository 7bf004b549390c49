//! Parsing the model's reply into the next action.

use serde_json::Value;
use webai_browser::annotate::sanitize_label;

const URL_MARKER: &str = r#"{"url": ""#;
const CLICK_MARKER: &str = r#"{"click": ""#;
const CLOSE_MARKER: &str = r#""}"#;

/// What the model asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Go to a URL.
    Navigate { url: String },
    /// Click the element whose label matches.
    Click { label: String },
    /// A final answer for the user.
    Answer(String),
}

impl Directive {
    /// Parse a reply. `url` wins over `click` when both appear.
    pub fn parse(reply: &str) -> Self {
        if let Some(url) = between(reply, URL_MARKER)
            && !url.trim().is_empty()
        {
            return Directive::Navigate {
                url: url.trim().to_string(),
            };
        }
        if let Some(label) = between(reply, CLICK_MARKER) {
            return Directive::Click {
                label: sanitize_label(label),
            };
        }
        if let Some(directive) = from_json_object(reply) {
            return directive;
        }
        Directive::Answer(reply.to_string())
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Directive::Answer(_))
    }
}

/// Text after `marker` up to the next `"}` (or the end of the reply).
fn between<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    Some(match rest.find(CLOSE_MARKER) {
        Some(end) => &rest[..end],
        None => rest,
    })
}

/// Looser form: the first `{...}` object with a string `url` or `click` key.
fn from_json_object(text: &str) -> Option<Directive> {
    let start = text.find('{')?;
    let value: Value = serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()?
        .ok()?;

    if let Some(url) = value.get("url").and_then(Value::as_str)
        && !url.trim().is_empty()
    {
        return Some(Directive::Navigate {
            url: url.trim().to_string(),
        });
    }
    value
        .get("click")
        .and_then(Value::as_str)
        .map(|label| Directive::Click {
            label: sanitize_label(label),
        })
}
