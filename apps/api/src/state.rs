use std::sync::Arc;

use crate::evaluation::evaluator::Evaluator;
use crate::evaluation::history::EvaluationHistory;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<Evaluator>,
    /// Session history backing the "recent evaluations" list and report downloads.
    pub history: Arc<EvaluationHistory>,
}
