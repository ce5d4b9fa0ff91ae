//! Layered extraction of structured values from free-text model output.
//!
//! 1. A reply that is a bare `[...]` is parsed with the literal parser.
//! 2. Otherwise a ```` ```json ```` fence, then the widest `{...}` / `[...]`
//!    spans (earliest first), are parsed as strict JSON.
//! 3. If nothing parses the caller gets an empty object and the last error.
//!
//! Recovery never fails outright; callers inspect [`Recovery::error`].

use crate::error::{EventPlanError, Result};
use crate::literal::parse_literal;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    /// The whole reply was a literal list.
    DirectLiteral,
    /// Parsed from a fenced block tagged `json`.
    FencedBlock,
    /// Parsed from the widest bracketed span in the reply.
    BracketSpan,
}

/// The shape a stage expects from the bracketed-span step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    Object,
    Array,
}

impl ExpectedShape {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    pub value: Value,
    pub strategy: Option<RecoveryStrategy>,
    pub error: Option<String>,
}

impl Recovery {
    fn recovered(value: Value, strategy: RecoveryStrategy) -> Self {
        Self {
            value,
            strategy: Some(strategy),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            value: Value::Object(Map::new()),
            strategy: None,
            error: Some(error),
        }
    }

    pub fn is_recovered(&self) -> bool {
        self.strategy.is_some()
    }

    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) if self.strategy.is_none() => Err(EventPlanError::Recovery(error)),
            _ => Ok(self.value),
        }
    }
}

fn fenced_json_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```json\s*([\s\S]*?)\s*```").expect("valid fence regex"))
}

fn object_span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid object regex"))
}

fn array_span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("valid array regex"))
}

/// Runs the recovery protocol over one model reply.
pub fn recover_json(text: &str, shape: ExpectedShape) -> Recovery {
    let trimmed = text.trim();
    let mut last_error: Option<String> = None;

    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        match parse_literal(trimmed) {
            Ok(value) => return Recovery::recovered(value, RecoveryStrategy::DirectLiteral),
            Err(e) => {
                debug!("Direct literal parse failed, trying fenced extraction: {}", e);
                last_error = Some(format!("Literal parse error: {}", e));
            }
        }
    }

    if let Some(block) = fenced_json_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
    {
        match serde_json::from_str::<Value>(block.as_str()) {
            Ok(value) => return Recovery::recovered(value, RecoveryStrategy::FencedBlock),
            Err(e) => {
                debug!("Fenced JSON block did not parse: {}", e);
                last_error = Some(format!("JSON parse error: {}", e));
            }
        }
    }

    // Spans are tried in order of appearance. A span of the wrong shape is kept
    // as a fallback; a later span nested inside it never replaces it.
    let mut outer: Option<(Value, usize, usize)> = None;
    for (start, end) in bracket_spans(text) {
        match serde_json::from_str::<Value>(&text[start..end]) {
            Ok(value) => {
                let nested = outer
                    .as_ref()
                    .map(|(_, s, e)| start >= *s && end <= *e)
                    .unwrap_or(false);
                if nested {
                    break;
                }
                if shape.matches(&value) {
                    return Recovery::recovered(value, RecoveryStrategy::BracketSpan);
                }
                outer.get_or_insert((value, start, end));
            }
            Err(e) => {
                debug!("Bracketed span did not parse: {}", e);
                last_error = Some(format!("JSON parse error: {}", e));
            }
        }
    }

    if let Some((value, _, _)) = outer {
        return Recovery::recovered(value, RecoveryStrategy::BracketSpan);
    }

    Recovery::failed(last_error.unwrap_or_else(|| "No JSON found in model output".to_string()))
}

fn bracket_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = [object_span_regex(), array_span_regex()]
        .iter()
        .filter_map(|re| re.find(text))
        .map(|m| (m.start(), m.end()))
        .collect();
    spans.sort_unstable();
    spans
}
