#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use browser_worker::dom::{ElementInfo, FieldInfo, RawElement, RawSnapshot, Script, Target};
use browser_worker::{Page, PageError};
use serde_json::{Value, json};

const INTERACTIVE_TAGS: [&str; 5] = ["a", "button", "input", "textarea", "select"];

#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    pub tag: String,
    pub kind: Option<String>,
    pub inner_text: String,
    pub placeholder: String,
    pub value: String,
    pub aria_label: String,
    pub name: String,
    pub hidden: bool,
    pub clicks: u32,
    /// Clicking navigates the page here.
    pub href: Option<String>,
}

impl FakeNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn link(text: &str) -> Self {
        Self {
            inner_text: text.to_string(),
            ..Self::new("a")
        }
    }

    pub fn button(text: &str) -> Self {
        Self {
            kind: Some("submit".into()),
            inner_text: text.to_string(),
            ..Self::new("button")
        }
    }

    pub fn input(kind: &str, placeholder: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            placeholder: placeholder.to_string(),
            ..Self::new("input")
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn navigates_to(mut self, url: &str) -> Self {
        self.href = Some(url.to_string());
        self
    }

    fn is_candidate(&self) -> bool {
        !self.hidden && INTERACTIVE_TAGS.contains(&self.tag.as_str())
    }

    fn is_field(&self) -> bool {
        !self.hidden && (self.tag == "input" || self.tag == "textarea")
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub url: String,
    pub title: String,
    pub body_text: String,
    pub nodes: Vec<FakeNode>,
    pub scroll_y: i64,
    /// Popped before each script evaluation.
    pub evaluate_failures: VecDeque<PageError>,
    pub navigation_error: Option<String>,
    /// Returned by every load wait when set.
    pub load_wait_error: Option<PageError>,
    pub navigations: Vec<String>,
    pub load_waits: u32,
    pub pauses: Vec<Duration>,
    pub evaluations: u32,
}

/// In-memory page that interprets the worker's scripts against a list of
/// nodes in document order.
#[derive(Debug, Default)]
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(url: &str, nodes: Vec<FakeNode>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                url: url.to_string(),
                title: "Fake".to_string(),
                body_text: "Fake page".to_string(),
                nodes,
                ..FakeState::default()
            }),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail_next_evaluations(&self, errors: impl IntoIterator<Item = PageError>) {
        self.state().evaluate_failures.extend(errors);
    }
}

fn resolve(state: &mut FakeState, target: Target) -> Option<&mut FakeNode> {
    match target {
        Target::Candidate(index) => state
            .nodes
            .iter_mut()
            .filter(|node| node.is_candidate())
            .take(80)
            .nth(index),
        Target::Field(index) => state.nodes.iter_mut().filter(|node| node.is_field()).nth(index),
    }
}

impl Page for FakePage {
    fn navigate(&self, url: &str) -> Result<(), PageError> {
        let mut state = self.state();
        if let Some(reason) = state.navigation_error.clone() {
            return Err(PageError::Navigation(reason));
        }
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    fn evaluate(&self, script: &Script) -> Result<Value, PageError> {
        let mut state = self.state();
        state.evaluations += 1;
        if let Some(err) = state.evaluate_failures.pop_front() {
            return Err(err);
        }

        let value = match script {
            Script::Snapshot { limit } => {
                let elements: Vec<RawElement> = state
                    .nodes
                    .iter()
                    .filter(|node| node.is_candidate())
                    .take(*limit)
                    .map(|node| RawElement {
                        tag: node.tag.clone(),
                        inner_text: node.inner_text.trim().to_string(),
                        placeholder: node.placeholder.trim().to_string(),
                        value: node.value.clone(),
                        kind: node.kind.clone(),
                    })
                    .collect();
                serde_json::to_value(RawSnapshot {
                    url: state.url.clone(),
                    title: state.title.clone(),
                    elements,
                    visible_text: state.body_text.clone(),
                })
                .unwrap()
            }
            Script::Describe { target } => {
                let info = resolve(&mut state, *target).map(|node| ElementInfo {
                    tag: node.tag.clone(),
                    kind: node.kind.clone(),
                });
                serde_json::to_value(info).unwrap()
            }
            Script::TextFields => {
                let fields: Vec<FieldInfo> = state
                    .nodes
                    .iter()
                    .filter(|node| node.is_field())
                    .map(|node| FieldInfo {
                        tag: node.tag.clone(),
                        kind: node.kind.clone(),
                        placeholder: node.placeholder.clone(),
                        aria_label: node.aria_label.clone(),
                        name: node.name.clone(),
                    })
                    .collect();
                serde_json::to_value(fields).unwrap()
            }
            Script::Activate { target } => {
                let href = match resolve(&mut state, *target) {
                    Some(node) => {
                        node.clicks += 1;
                        node.href.clone()
                    }
                    None => return Ok(json!(false)),
                };
                if let Some(url) = href {
                    state.url = url;
                }
                json!(true)
            }
            Script::Fill { target, value } => match resolve(&mut state, *target) {
                Some(node) => {
                    node.value = value.clone();
                    json!(true)
                }
                None => json!(false),
            },
            Script::ScrollBy { dy } => {
                state.scroll_y += dy;
                json!(true)
            }
        };
        Ok(value)
    }

    fn wait_for_dom_content_loaded(&self, _timeout: Duration) -> Result<(), PageError> {
        let mut state = self.state();
        state.load_waits += 1;
        match state.load_wait_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn pause(&self, duration: Duration) {
        self.state().pauses.push(duration);
    }

    fn current_url(&self) -> String {
        self.state().url.clone()
    }
}
