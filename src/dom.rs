//! Page-context scripts and the element addressing built on them.
//!
//! Every script shares one `visible(selector, limit)` helper, so the
//! observation, click, type and field-search paths all agree on what a
//! visible candidate is. Nothing here holds element handles: a [`Target`]
//! is an ordinal that is re-resolved against the live DOM on each call, and
//! is only meaningful relative to the observation it was read from.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::PageError;
use crate::page::Page;
use crate::types::{
    ELEMENT_TEXT_MAX_CHARS, INTERACTIVE_SELECTOR, MAX_INTERACTIVE_ELEMENTS, TEXT_FIELD_SELECTOR,
    VISIBLE_TEXT_MAX_CHARS,
};

/// Address of an element, relative to the current DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum Target {
    /// Nth visible interactive candidate (capped list, same as observations).
    Candidate(usize),
    /// Nth visible `input`/`textarea`, uncapped.
    Field(usize),
}

impl Target {
    /// Maps a controller-supplied element id onto a candidate ordinal.
    /// Ids that can never appear in an observation resolve to `None`.
    pub fn candidate(element_id: i64) -> Option<Self> {
        usize::try_from(element_id)
            .ok()
            .filter(|&ordinal| ordinal < MAX_INTERACTIVE_ELEMENTS)
            .map(Target::Candidate)
    }
}

/// The fixed set of scripts the worker runs in page context.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    Snapshot { limit: usize },
    Describe { target: Target },
    TextFields,
    Activate { target: Target },
    Fill { target: Target, value: String },
    ScrollBy { dy: i64 },
}

const PRELUDE: &str = r#"
  const visible = (selector, limit) => {
    const out = [];
    for (const el of document.querySelectorAll(selector)) {
      const r = el.getBoundingClientRect();
      if (!r || r.width === 0 || r.height === 0) continue;
      out.push(el);
      if (limit !== null && out.length >= limit) break;
    }
    return out;
  };
  const resolve = (target) => {
    const list = target.kind === 'candidate'
      ? visible(INTERACTIVE, LIMIT)
      : visible(FIELDS, null);
    return list[target.index] || null;
  };
  // code-point safe: never leaves half a surrogate pair behind
  const clip = (s, n) => Array.from(String(s ?? '').slice(0, n * 2)).slice(0, n).join('');
  const kindOf = (el) => (typeof el.type === 'string' && el.type) ? el.type : null;
"#;

const SNAPSHOT_JS: &str = r#"({ limit, textLimit, visibleTextLimit }) => ({
    url: window.location.href,
    title: document.title,
    elements: visible(INTERACTIVE, limit).map((el) => ({
      tag: el.tagName.toLowerCase(),
      inner_text: clip((el.innerText || '').trim(), textLimit),
      placeholder: clip((el.placeholder || '').trim(), textLimit),
      value: clip(el.value || '', textLimit),
      type: kindOf(el),
    })),
    visible_text: (document.body && document.body.innerText)
      ? clip(document.body.innerText, visibleTextLimit)
      : '',
  })"#;

const DESCRIBE_JS: &str = r#"({ target }) => {
    const el = resolve(target);
    return el ? { tag: el.tagName.toLowerCase(), type: kindOf(el) } : null;
  }"#;

const TEXT_FIELDS_JS: &str = r#"() => visible(FIELDS, null).map((el) => ({
    tag: el.tagName.toLowerCase(),
    type: kindOf(el),
    placeholder: el.placeholder || '',
    aria_label: el.getAttribute('aria-label') || '',
    name: el.name || '',
  }))"#;

const ACTIVATE_JS: &str = r#"({ target }) => {
    const el = resolve(target);
    if (!el) return false;
    el.click();
    return true;
  }"#;

const FILL_JS: &str = r#"({ target, value }) => {
    const el = resolve(target);
    if (!el) return false;
    el.focus();
    el.value = value;
    el.dispatchEvent(new Event('input', { bubbles: true }));
    return true;
  }"#;

const SCROLL_JS: &str = r#"({ dy }) => {
    window.scrollBy(0, dy);
    return true;
  }"#;

impl Script {
    /// Renders the script as a single expression. The expression evaluates
    /// to a JSON string holding a [`ScriptOutcome`].
    pub fn source(&self) -> String {
        let (body, args) = match self {
            Script::Snapshot { limit } => (
                SNAPSHOT_JS,
                json!({
                    "limit": limit,
                    "textLimit": ELEMENT_TEXT_MAX_CHARS,
                    "visibleTextLimit": VISIBLE_TEXT_MAX_CHARS,
                }),
            ),
            Script::Describe { target } => (DESCRIBE_JS, json!({ "target": target })),
            Script::TextFields => (TEXT_FIELDS_JS, json!({})),
            Script::Activate { target } => (ACTIVATE_JS, json!({ "target": target })),
            Script::Fill { target, value } => {
                (FILL_JS, json!({ "target": target, "value": value }))
            }
            Script::ScrollBy { dy } => (SCROLL_JS, json!({ "dy": dy })),
        };

        format!(
            "(() => {{\n  const INTERACTIVE = {interactive};\n  const FIELDS = {fields};\n  const LIMIT = {limit};\n{PRELUDE}\n  const run = {body};\n  try {{\n    return JSON.stringify({{ ok: true, value: run({args}) ?? null }});\n  }} catch (e) {{\n    return JSON.stringify({{ ok: false, error: String((e && e.message) || e) }});\n  }}\n}})()",
            interactive = Value::from(INTERACTIVE_SELECTOR),
            fields = Value::from(TEXT_FIELD_SELECTOR),
            limit = MAX_INTERACTIVE_ELEMENTS,
        )
    }
}

/// Envelope every script returns.
#[derive(Debug, Deserialize)]
pub struct ScriptOutcome {
    pub ok: bool,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScriptOutcome {
    pub fn into_result(self) -> Result<Value, PageError> {
        if self.ok {
            Ok(self.value)
        } else {
            Err(PageError::Script(
                self.error.unwrap_or_else(|| "unknown script error".to_string()),
            ))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub elements: Vec<RawElement>,
    #[serde(default)]
    pub visible_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    pub tag: String,
    #[serde(default)]
    pub inner_text: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Metadata the input heuristic scores on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub tag: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub aria_label: String,
    #[serde(default)]
    pub name: String,
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, PageError> {
    serde_json::from_value(value).map_err(|e| PageError::Protocol(e.to_string()))
}

pub fn snapshot(page: &dyn Page) -> Result<RawSnapshot, PageError> {
    decode(page.evaluate(&Script::Snapshot {
        limit: MAX_INTERACTIVE_ELEMENTS,
    })?)
}

pub fn describe(page: &dyn Page, target: Target) -> Result<Option<ElementInfo>, PageError> {
    decode(page.evaluate(&Script::Describe { target })?)
}

pub fn text_fields(page: &dyn Page) -> Result<Vec<FieldInfo>, PageError> {
    decode(page.evaluate(&Script::TextFields)?)
}

/// Clicks the target. `Ok(false)` means it no longer resolves.
pub fn activate(page: &dyn Page, target: Target) -> Result<bool, PageError> {
    decode(page.evaluate(&Script::Activate { target })?)
}

/// Sets the target's value and fires `input`. `Ok(false)` means it no longer resolves.
pub fn fill(page: &dyn Page, target: Target, value: &str) -> Result<bool, PageError> {
    decode(page.evaluate(&Script::Fill {
        target,
        value: value.to_string(),
    })?)
}

pub fn scroll_by(page: &dyn Page, dy: i64) -> Result<(), PageError> {
    page.evaluate(&Script::ScrollBy { dy })?;
    Ok(())
}
