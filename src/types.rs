use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WorkerError;

pub const INTERACTIVE_SELECTOR: &str = "a, button, input, textarea, select";
pub const TEXT_FIELD_SELECTOR: &str = "input, textarea";

pub const MAX_INTERACTIVE_ELEMENTS: usize = 80;
pub const ELEMENT_TEXT_MAX_CHARS: usize = 100;
pub const VISIBLE_TEXT_MAX_CHARS: usize = 8000;

pub const MAX_OBSERVATION_ATTEMPTS: u32 = 3;
pub const LOAD_WAIT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const RECOVERY_SETTLE: Duration = Duration::from_millis(250);
pub const CLICK_SETTLE: Duration = Duration::from_millis(200);
pub const TYPE_SETTLE: Duration = Duration::from_millis(150);

pub const SCROLL_STEP_PX: i64 = 700;
pub const DEFAULT_WAIT_MS: u64 = 500;

/// One request line from the controller, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub args: Option<Map<String, Value>>,
}

/// A validated command. `element_id` is an ordinal into the most recent
/// observation and is only meaningful while that observation is current.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate { url: String },
    Click { element_id: i64 },
    Type { element_id: i64, text: String },
    Scroll { direction: Direction },
    Wait { milliseconds: u64 },
    Observe,
    Exit,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Scroll { .. } => "scroll",
            Action::Wait { .. } => "wait",
            Action::Observe => "observe",
            Action::Exit => "exit",
        }
    }
}

impl TryFrom<Command> for Action {
    type Error = WorkerError;

    fn try_from(command: Command) -> Result<Self, Self::Error> {
        let action = command
            .action
            .ok_or_else(|| WorkerError::malformed("missing required field: action"))?;
        let args = command.args.unwrap_or_default();

        match action.as_str() {
            "navigate" => Ok(Action::Navigate {
                url: match required(&args, "url")? {
                    Value::String(url) => url.clone(),
                    other => return Err(WorkerError::malformed(format!("url must be a string, got {other}"))),
                },
            }),
            "click" => Ok(Action::Click {
                element_id: integer_arg("element_id", required(&args, "element_id")?)?,
            }),
            "type" => Ok(Action::Type {
                element_id: integer_arg("element_id", required(&args, "element_id")?)?,
                text: text_arg("text", required(&args, "text")?)?,
            }),
            "scroll" => Ok(Action::Scroll {
                direction: Direction::from_arg(args.get("direction")),
            }),
            "wait" => {
                let milliseconds = match args.get("milliseconds") {
                    None => DEFAULT_WAIT_MS,
                    Some(value) => u64::try_from(integer_arg("milliseconds", value)?)
                        .map_err(|_| WorkerError::malformed("milliseconds must not be negative"))?,
                };
                Ok(Action::Wait { milliseconds })
            }
            "observe" => Ok(Action::Observe),
            "exit" => Ok(Action::Exit),
            _ => Err(WorkerError::UnknownAction(action)),
        }
    }
}

fn required<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a Value, WorkerError> {
    args.get(name)
        .ok_or_else(|| WorkerError::malformed(format!("missing required argument: {name}")))
}

/// Integers, finite floats (truncated) and integer strings are accepted.
fn integer_arg(name: &str, value: &Value) -> Result<i64, WorkerError> {
    let coerced = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    coerced.ok_or_else(|| WorkerError::malformed(format!("{name} must be an integer, got {value}")))
}

fn text_arg(name: &str, value: &Value) -> Result<String, WorkerError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(WorkerError::malformed(format!("{name} must be a string, got {other}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
}

impl Direction {
    /// Only the literal string "down" (or no value) scrolls down.
    pub fn from_arg(value: Option<&Value>) -> Self {
        match value {
            None => Direction::Down,
            Some(Value::String(s)) if s == "down" => Direction::Down,
            Some(_) => Direction::Up,
        }
    }

    pub fn delta(self) -> i64 {
        match self {
            Direction::Down => SCROLL_STEP_PX,
            Direction::Up => -SCROLL_STEP_PX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// One response line. Exactly one of `message` / `observation` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<Observation>,
}

impl Response {
    pub fn started() -> Self {
        Self::message("worker_started")
    }

    pub fn exiting() -> Self {
        Self::message("exiting")
    }

    fn message(message: &str) -> Self {
        Self {
            status: Status::Ok,
            message: Some(message.to_string()),
            observation: None,
        }
    }

    pub fn observation(observation: Observation) -> Self {
        Self {
            status: Status::Ok,
            message: None,
            observation: Some(observation),
        }
    }

    pub fn error(err: &WorkerError) -> Self {
        Self {
            status: Status::Error,
            message: Some(err.to_string()),
            observation: None,
        }
    }
}

/// What the controller sees after every successful command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub url: String,
    pub title: String,
    pub interactive_elements: Vec<InteractiveElement>,
    pub visible_text: String,
}

impl Observation {
    /// Returned when the page never settled long enough to be read.
    pub fn degraded(url: String) -> Self {
        Self {
            url,
            title: String::new(),
            interactive_elements: Vec::new(),
            visible_text: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub id: usize,
    pub tag: Tag,
    pub role: Role,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    A,
    Button,
    Input,
    Textarea,
    Select,
}

impl Tag {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "a" => Some(Tag::A),
            "button" => Some(Tag::Button),
            "input" => Some(Tag::Input),
            "textarea" => Some(Tag::Textarea),
            "select" => Some(Tag::Select),
            _ => None,
        }
    }

    pub fn role(self) -> Role {
        match self {
            Tag::Input | Tag::Textarea => Role::Input,
            Tag::Button => Role::Button,
            Tag::A => Role::Link,
            Tag::Select => Role::Control,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Link,
    Button,
    Input,
    Control,
}
