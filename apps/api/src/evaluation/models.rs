use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::EvaluationError;
use crate::evaluation::fetcher::ScratchFile;

/// One user action: a job description and a link to the resume document.
/// Missing fields read as empty so they fail the same blank-input check.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub resume_url: String,
}

/// A downloaded resume. Lives only for the duration of one evaluation;
/// the scratch copy is removed when the document is dropped.
#[derive(Debug)]
pub struct RawDocument {
    pub source_url: String,
    pub scratch: ScratchFile,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewLikelihood {
    High,
    #[default]
    Medium,
    Low,
}

impl InterviewLikelihood {
    /// Case-insensitive match on the three allowed labels.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Which normalization path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Structured,
    TextFallback,
}

/// The model's verdict after normalization.
///
/// `overall_score` is always within 0..=10 and `interview_likelihood` is one
/// of the three enumerated values, whatever the service actually returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub overall_score: u8,
    pub explanation: String,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_match: String,
    pub education_match: String,
    pub recommendations: Vec<String>,
    pub interview_likelihood: InterviewLikelihood,
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub source: ResultSource,
}

/// Qualitative bucket for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchBand {
    Excellent,
    Good,
    Average,
    Poor,
}

impl MatchBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            8.. => Self::Excellent,
            6..=7 => Self::Good,
            4..=5 => Self::Average,
            _ => Self::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent Match",
            Self::Good => "Good Match",
            Self::Average => "Average Match",
            Self::Poor => "Poor Match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Download,
    Storage,
    Extraction,
    EmptyContent,
    Service,
}

/// What a caller gets back from one evaluation: either a full result or a
/// named failure. Never a partially filled result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Completed(EvaluationResult),
    Failed { kind: FailureKind, error: String },
}

impl EvaluationOutcome {
    pub fn score(&self) -> Option<u8> {
        match self {
            Self::Completed(result) => Some(result.overall_score),
            Self::Failed { .. } => None,
        }
    }

    pub fn band(&self) -> Option<MatchBand> {
        self.score().map(MatchBand::for_score)
    }
}

impl From<EvaluationError> for EvaluationOutcome {
    fn from(err: EvaluationError) -> Self {
        Self::Failed {
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}
