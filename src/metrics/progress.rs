use serde::Serialize;

use crate::model::AnnotatorSubmission;

use super::rate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressRow {
    pub language: String,
    pub annotated: usize,
    pub total: usize,
    pub progress_pct: f64,
}

/// Substantive annotations against the number of items in the base dataset.
pub fn progress(base_item_count: usize, submission: &AnnotatorSubmission) -> ProgressRow {
    let annotated = submission
        .records()
        .iter()
        .filter(|record| !record.predicted.is_excluded())
        .count();

    ProgressRow {
        language: submission.language().to_string(),
        annotated,
        total: base_item_count,
        progress_pct: 100.0 * rate(annotated, base_item_count),
    }
}
