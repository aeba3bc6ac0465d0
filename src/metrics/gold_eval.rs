use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AnnotatorSubmission, GoldStandard, Label, SUBSTANTIVE_LABELS};
use crate::stats::{Association, ContingencyTable, associate};

use super::{LanguageSource, rate};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResult {
    pub per_label: BTreeMap<Label, LabelMetrics>,
    pub accuracy: f64,
    pub excluded_rate: f64,
    pub total_records: usize,
    pub excluded_count: usize,
    /// Records present in gold with a substantive prediction.
    pub matched_count: usize,
    pub correct_count: usize,
    /// Records whose item is absent from gold.
    pub unmatched_count: usize,
    pub confusion: ContingencyTable,
    pub association: Association,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Evaluated { metrics: MetricsResult },
    Missing,
    Invalid { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageEvaluation {
    pub language: String,
    pub outcome: EvaluationOutcome,
}

impl LanguageEvaluation {
    pub fn metrics(&self) -> Option<&MetricsResult> {
        match &self.outcome {
            EvaluationOutcome::Evaluated { metrics } => Some(metrics),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoldEvaluationReport {
    pub languages: Vec<LanguageEvaluation>,
    pub overall_accuracy: Option<f64>,
    pub overall_matched_count: usize,
}

/// Scores one submission against gold.
///
/// Excluded predictions on gold items are counted but never enter
/// precision, recall or accuracy. The excluded rate divides by the full
/// submission size, items missing from gold included.
pub fn evaluate(gold: &GoldStandard, submission: &AnnotatorSubmission) -> MetricsResult {
    let mut true_positive = [0_usize; 3];
    let mut false_positive = [0_usize; 3];
    let mut false_negative = [0_usize; 3];
    let mut support = [0_usize; 3];
    let mut confusion = ContingencyTable::square(
        SUBSTANTIVE_LABELS
            .iter()
            .map(|label| label.to_string())
            .collect(),
    );

    let mut excluded_count = 0;
    let mut matched_count = 0;
    let mut unmatched_count = 0;

    for record in submission.records() {
        let Some(gold_label) = gold.get(&record.item_id) else {
            unmatched_count += 1;
            continue;
        };
        let Some(predicted) = record.predicted.substantive() else {
            excluded_count += 1;
            continue;
        };

        matched_count += 1;
        support[gold_label.index()] += 1;
        confusion.increment(gold_label.index(), predicted.index());
        if predicted == gold_label {
            true_positive[gold_label.index()] += 1;
        } else {
            false_positive[predicted.index()] += 1;
            false_negative[gold_label.index()] += 1;
        }
    }

    let per_label = SUBSTANTIVE_LABELS
        .iter()
        .map(|label| {
            let index = label.index();
            let tp = true_positive[index];
            let precision = rate(tp, tp + false_positive[index]);
            let recall = rate(tp, tp + false_negative[index]);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            (
                *label,
                LabelMetrics {
                    precision,
                    recall,
                    f1,
                    support: support[index],
                },
            )
        })
        .collect::<BTreeMap<Label, LabelMetrics>>();

    let correct_count = true_positive.iter().sum::<usize>();

    MetricsResult {
        per_label,
        accuracy: rate(correct_count, matched_count),
        excluded_rate: rate(excluded_count, submission.len()),
        total_records: submission.len(),
        excluded_count,
        matched_count,
        correct_count,
        unmatched_count,
        association: associate(&confusion),
        confusion,
    }
}

/// Pooled accuracy: each submission weighted by its matched-record count.
pub fn weighted_accuracy<'a>(results: impl IntoIterator<Item = &'a MetricsResult>) -> Option<f64> {
    let (correct, matched) = results
        .into_iter()
        .fold((0_usize, 0_usize), |(correct, matched), result| {
            (correct + result.correct_count, matched + result.matched_count)
        });
    if matched == 0 {
        None
    } else {
        Some(correct as f64 / matched as f64)
    }
}

pub fn evaluate_languages(gold: &GoldStandard, sources: &[LanguageSource]) -> GoldEvaluationReport {
    let mut languages = sources
        .iter()
        .map(|source| LanguageEvaluation {
            language: source.language().to_string(),
            outcome: match source {
                LanguageSource::Loaded(submission) => EvaluationOutcome::Evaluated {
                    metrics: evaluate(gold, submission),
                },
                LanguageSource::Missing { .. } => EvaluationOutcome::Missing,
                LanguageSource::Invalid { reason, .. } => EvaluationOutcome::Invalid {
                    reason: reason.clone(),
                },
            },
        })
        .collect::<Vec<LanguageEvaluation>>();
    languages.sort_by(|left, right| left.language.cmp(&right.language));

    let evaluated = languages
        .iter()
        .filter_map(LanguageEvaluation::metrics)
        .collect::<Vec<&MetricsResult>>();

    GoldEvaluationReport {
        overall_accuracy: weighted_accuracy(evaluated.iter().copied()),
        overall_matched_count: evaluated.iter().map(|metrics| metrics.matched_count).sum(),
        languages,
    }
}
