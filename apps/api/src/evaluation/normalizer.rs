//! Response Normalizer — turns untrusted completion text into an
//! `EvaluationResult`.
//!
//! Two tiers:
//! 1. Strict: strip code fences, decode a JSON object, fill absent fields
//!    with defaults, clamp the score, coerce the likelihood.
//! 2. Fallback: when the text is not a JSON object, scan for a
//!    `score <digits>` pattern and wrap a preview of the raw text.
//!
//! `normalize` never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::evaluation::models::{EvaluationResult, InterviewLikelihood, ResultSource};

pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 10;
/// Score used when the service gives none.
pub const DEFAULT_SCORE: u8 = 5;
/// Characters of raw completion text kept as the fallback explanation.
pub const FALLBACK_PREVIEW_CHARS: usize = 1000;

const DEFAULT_EXPLANATION: &str = "No explanation available";
const NOT_ASSESSED: &str = "Not assessed";

/// First "score" followed by an optionally signed digit run, case-insensitive.
/// Known weakness: matches inside unrelated sentences too.
static SCORE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)score\W*?(-?\d+)").expect("score pattern is valid")
});

/// The ten schema fields exactly as the service may (or may not) send them.
/// Every field is optional and loosely typed; defaults are applied in
/// `EvaluationResult::from_raw`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawEvaluation {
    pub overall_score: Option<Value>,
    pub explanation: Option<Value>,
    pub matching_skills: Option<Value>,
    pub missing_skills: Option<Value>,
    pub experience_match: Option<Value>,
    pub education_match: Option<Value>,
    pub recommendations: Option<Value>,
    pub interview_likelihood: Option<Value>,
    pub key_strengths: Option<Value>,
    pub areas_for_improvement: Option<Value>,
}

impl EvaluationResult {
    /// Builds a structured result, substituting defaults for absent or
    /// mistyped fields.
    pub fn from_raw(raw: RawEvaluation) -> Self {
        Self {
            overall_score: raw
                .overall_score
                .as_ref()
                .and_then(score_from_value)
                .unwrap_or(DEFAULT_SCORE),
            explanation: text_or(raw.explanation, DEFAULT_EXPLANATION),
            matching_skills: string_list(raw.matching_skills),
            missing_skills: string_list(raw.missing_skills),
            experience_match: text_or(raw.experience_match, NOT_ASSESSED),
            education_match: text_or(raw.education_match, NOT_ASSESSED),
            recommendations: string_list(raw.recommendations),
            interview_likelihood: raw
                .interview_likelihood
                .as_ref()
                .and_then(Value::as_str)
                .and_then(InterviewLikelihood::parse)
                .unwrap_or_default(),
            key_strengths: string_list(raw.key_strengths),
            areas_for_improvement: string_list(raw.areas_for_improvement),
            source: ResultSource::Structured,
        }
    }

    /// Best-effort result for completion text that is not a JSON object.
    pub fn from_text(raw_text: &str) -> Self {
        Self {
            overall_score: extract_score(raw_text),
            explanation: preview(raw_text.trim(), FALLBACK_PREVIEW_CHARS),
            matching_skills: vec![],
            missing_skills: vec![],
            experience_match: NOT_ASSESSED.to_string(),
            education_match: NOT_ASSESSED.to_string(),
            recommendations: vec![],
            interview_likelihood: InterviewLikelihood::Medium,
            key_strengths: vec![],
            areas_for_improvement: vec![],
            source: ResultSource::TextFallback,
        }
    }
}

/// Normalizes raw completion text. Infallible by construction.
pub fn normalize(raw_text: &str) -> EvaluationResult {
    match parse_object(strip_json_fences(raw_text)) {
        Ok(raw) => EvaluationResult::from_raw(raw),
        Err(reason) => {
            warn!("Completion was not a JSON object ({reason}); using text fallback");
            EvaluationResult::from_text(raw_text)
        }
    }
}

// Arrays would otherwise deserialize positionally into the struct.
fn parse_object(body: &str) -> Result<RawEvaluation, String> {
    match serde_json::from_str::<Value>(body).map_err(|e| e.to_string())? {
        object @ Value::Object(_) => serde_json::from_value(object).map_err(|e| e.to_string()),
        other => Err(format!("expected an object, got {}", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

/// Heuristic score scan for the fallback path. Defaults to 5, clamps to 0..=10.
pub fn extract_score(text: &str) -> u8 {
    SCORE_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| {
            let digits = m.as_str();
            match digits.parse::<i64>() {
                Ok(n) => clamp_score(n),
                // Too many digits for i64: saturate by sign.
                Err(_) if digits.starts_with('-') => MIN_SCORE,
                Err(_) => MAX_SCORE,
            }
        })
        .unwrap_or(DEFAULT_SCORE)
}

pub fn clamp_score(score: i64) -> u8 {
    // Lossless: the clamped value fits in u8.
    score.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8
}

fn score_from_value(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))?
        }
        _ => return None,
    };
    Some(clamp_score(number))
}

fn text_or(value: Option<Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => vec![],
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
