//! Pure metric computations over already-ingested annotations. Every
//! function takes immutable inputs and returns a fresh result value.

mod agreement;
mod gold_eval;
mod phenomena;
mod progress;
#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::model::AnnotatorSubmission;

pub use agreement::{
    AgreementReport, AgreementSummary, PerItemAgreement, aggregate, dominant_label, fleiss_kappa,
};
pub use gold_eval::{
    EvaluationOutcome, GoldEvaluationReport, LabelMetrics, LanguageEvaluation, MetricsResult,
    evaluate, evaluate_languages, weighted_accuracy,
};
pub use phenomena::{
    PhenomenonBreakdown, PhenomenonRow, average_accuracy, breakdown, breakdown_languages,
    dedup_phenomena, observed_phenomena, phenomenon_effect,
};
pub use progress::{ProgressRow, progress};

/// One requested language after source resolution.
#[derive(Debug, Clone)]
pub enum LanguageSource {
    Loaded(AnnotatorSubmission),
    Missing { language: String },
    Invalid { language: String, reason: String },
}

impl LanguageSource {
    pub fn language(&self) -> &str {
        match self {
            Self::Loaded(submission) => submission.language(),
            Self::Missing { language } | Self::Invalid { language, .. } => language,
        }
    }

    pub fn submission(&self) -> Option<&AnnotatorSubmission> {
        match self {
            Self::Loaded(submission) => Some(submission),
            _ => None,
        }
    }

    pub fn unavailable(&self) -> Option<UnavailableSource> {
        match self {
            Self::Loaded(_) => None,
            Self::Missing { language } => Some(UnavailableSource {
                language: language.clone(),
                reason: "missing".to_string(),
            }),
            Self::Invalid { language, reason } => Some(UnavailableSource {
                language: language.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableSource {
    pub language: String,
    pub reason: String,
}

pub fn loaded_submissions(sources: &[LanguageSource]) -> Vec<&AnnotatorSubmission> {
    let mut submissions = sources
        .iter()
        .filter_map(LanguageSource::submission)
        .collect::<Vec<&AnnotatorSubmission>>();
    submissions.sort_by(|left, right| left.language().cmp(right.language()));
    submissions
}

pub fn unavailable_sources(sources: &[LanguageSource]) -> Vec<UnavailableSource> {
    let mut unavailable = sources
        .iter()
        .filter_map(LanguageSource::unavailable)
        .collect::<Vec<UnavailableSource>>();
    unavailable.sort_by(|left, right| left.language.cmp(&right.language));
    unavailable
}

/// `numerator / denominator`, or 0 when the denominator is 0.
pub(crate) fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
