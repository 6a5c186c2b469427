//! Picks which text field a `type` command should write into when the
//! requested element cannot take text.
//!
//! Scoring is a pure function of a field's placeholder, aria-label and
//! name, driven by a keyword/weight table. The default table is tuned for
//! job-search forms and steers away from credential fields.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dom::FieldInfo;

const TEXT_LIKE_TYPES: [&str; 4] = ["text", "search", "email", ""];

/// `textarea`, or an `input` whose type is missing or text-like.
pub fn is_text_enterable(tag: &str, kind: Option<&str>) -> bool {
    match tag.to_ascii_lowercase().as_str() {
        "textarea" => true,
        "input" => kind.is_none_or(|kind| TEXT_LIKE_TYPES.contains(&kind.to_lowercase().as_str())),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub weight: i32,
}

impl KeywordRule {
    fn new(keywords: &[&str], weight: i32) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub rules: Vec<KeywordRule>,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            rules: vec![
                KeywordRule::new(&["професс"], 5),
                KeywordRule::new(&["должност"], 5),
                KeywordRule::new(&["компан"], 4),
                KeywordRule::new(&["поиск"], 3),
                KeywordRule::new(&["search"], 2),
                KeywordRule::new(&["телефон", "phone"], -100),
                KeywordRule::new(&["парол", "password"], -100),
                KeywordRule::new(&["email"], -50),
            ],
        }
    }
}

impl ScoringRules {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input rules from {}", path.display()))?;
        let mut rules: ScoringRules = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid input rules in {}", path.display()))?;
        for rule in &mut rules.rules {
            for keyword in &mut rule.keywords {
                *keyword = keyword.to_lowercase();
            }
        }
        Ok(rules)
    }

    /// Each rule counts once, if any of its keywords occurs in the
    /// lowercased `placeholder aria-label name` text.
    pub fn score(&self, field: &FieldInfo) -> i32 {
        let meta = format!("{} {} {}", field.placeholder, field.aria_label, field.name).to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|keyword| meta.contains(keyword.as_str())))
            .map(|rule| rule.weight)
            .sum()
    }

    /// Index (into `fields`) of the best text-enterable field. Ties go to
    /// the earliest field in document order.
    pub fn pick(&self, fields: &[FieldInfo]) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (index, field) in fields.iter().enumerate() {
            if !is_text_enterable(&field.tag, field.kind.as_deref()) {
                continue;
            }
            let score = self.score(field);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }
}
