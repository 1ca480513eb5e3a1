//! In-memory session history and the downloadable JSON report.
//!
//! History is process-local and lost on restart.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::evaluation::models::EvaluationOutcome;

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub outcome: EvaluationOutcome,
}

/// Serialized form offered for download.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub evaluation_date: String,
    pub overall_score: Option<u8>,
    pub analysis: EvaluationOutcome,
}

impl EvaluationReport {
    /// Dated by when the evaluation ran, not when the report is requested.
    pub fn for_entry(entry: &HistoryEntry) -> Self {
        Self {
            evaluation_date: entry.timestamp.format(DISPLAY_TIME_FORMAT).to_string(),
            overall_score: entry.outcome.score(),
            analysis: entry.outcome.clone(),
        }
    }

    pub fn file_name(generated_at: DateTime<Utc>) -> String {
        format!("ats_evaluation_{}.json", generated_at.format(FILE_TIME_FORMAT))
    }
}

/// Bounded list of past evaluations, oldest dropped first.
pub struct EvaluationHistory {
    entries: RwLock<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl EvaluationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Records an outcome (failures included) and returns the stored entry.
    pub async fn record(&self, outcome: EvaluationOutcome) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            outcome,
        };
        if self.capacity == 0 {
            return entry;
        }

        let mut entries = self.entries.write().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    /// Up to `limit` entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub async fn get(&self, id: Uuid) -> Option<HistoryEntry> {
        let entries = self.entries.read().await;
        entries.iter().find(|e| e.id == id).cloned()
    }
}
