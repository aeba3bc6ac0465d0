use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AnnotatorSubmission, ItemId, Label, LabelCounts, SUBSTANTIVE_LABELS};
use crate::stats::{ChiSquareResult, chi_square_uniformity};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerItemAgreement {
    pub item_id: ItemId,
    pub label_counts: LabelCounts,
    /// Excluded ratings dropped before counting.
    pub excluded_count: usize,
    pub rater_count: usize,
    pub dominant_label: Label,
    pub dominant_count: usize,
    /// dominant_count / rater_count, as a percentage.
    pub agreement_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementSummary {
    pub languages: Vec<String>,
    pub item_count: usize,
    pub kappa_item_count: usize,
    pub rating_count: usize,
    pub excluded_rating_count: usize,
    pub label_totals: LabelCounts,
    pub average_agreement_pct: f64,
    pub fleiss_kappa: Option<f64>,
    pub chi_square: ChiSquareResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementReport {
    pub per_item: Vec<PerItemAgreement>,
    pub summary: AgreementSummary,
}

#[derive(Debug, Default)]
struct ItemTally {
    counts: LabelCounts,
    excluded: usize,
}

/// Cross-language agreement over every item that kept at least one
/// substantive rating. Items and languages are visited in sorted order.
pub fn aggregate(submissions: &[&AnnotatorSubmission]) -> AgreementReport {
    let mut ordered = submissions.to_vec();
    ordered.sort_by(|left, right| left.language().cmp(right.language()));

    let mut tallies = BTreeMap::<ItemId, ItemTally>::new();
    for submission in &ordered {
        for record in submission.records() {
            let tally = tallies.entry(record.item_id.clone()).or_default();
            match record.predicted.substantive() {
                Some(label) => tally.counts.add(label),
                None => tally.excluded += 1,
            }
        }
    }

    let excluded_rating_count = tallies.values().map(|tally| tally.excluded).sum::<usize>();

    let per_item = tallies
        .into_iter()
        .filter_map(|(item_id, tally)| {
            let (dominant_label, dominant_count) = dominant_label(&tally.counts)?;
            let rater_count = tally.counts.total();
            Some(PerItemAgreement {
                item_id,
                label_counts: tally.counts,
                excluded_count: tally.excluded,
                rater_count,
                dominant_label,
                dominant_count,
                agreement_pct: 100.0 * dominant_count as f64 / rater_count as f64,
            })
        })
        .collect::<Vec<PerItemAgreement>>();

    let mut label_totals = LabelCounts::default();
    for item in &per_item {
        label_totals.entailment += item.label_counts.entailment;
        label_totals.contradiction += item.label_counts.contradiction;
        label_totals.neutral += item.label_counts.neutral;
    }

    let average_agreement_pct = if per_item.is_empty() {
        0.0
    } else {
        per_item.iter().map(|item| item.agreement_pct).sum::<f64>() / per_item.len() as f64
    };

    let item_counts = per_item
        .iter()
        .map(|item| item.label_counts)
        .collect::<Vec<LabelCounts>>();
    let observed = label_totals.as_array().map(|count| count as u64);

    let summary = AgreementSummary {
        languages: ordered
            .iter()
            .map(|submission| submission.language().to_string())
            .collect(),
        item_count: per_item.len(),
        kappa_item_count: item_counts.iter().filter(|counts| counts.total() >= 2).count(),
        rating_count: label_totals.total(),
        excluded_rating_count,
        label_totals,
        average_agreement_pct,
        fleiss_kappa: fleiss_kappa(&item_counts),
        chi_square: chi_square_uniformity(&observed),
    };

    AgreementReport { per_item, summary }
}

/// Most frequent label; ties go to the earliest label in canonical order
/// (Entailment, Contradiction, Neutral). `None` when nothing was counted.
pub fn dominant_label(counts: &LabelCounts) -> Option<(Label, usize)> {
    let mut best: Option<(Label, usize)> = None;
    for label in SUBSTANTIVE_LABELS {
        let count = counts.get(label);
        if count > 0 && best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }
    best
}

/// Fleiss' kappa for a varying number of raters per item.
///
/// Items with fewer than two ratings are ignored. Returns `None` when no
/// item qualifies or when chance agreement is 1.
pub fn fleiss_kappa(items: &[LabelCounts]) -> Option<f64> {
    let rated = items
        .iter()
        .filter(|counts| counts.total() >= 2)
        .collect::<Vec<&LabelCounts>>();
    if rated.is_empty() {
        return None;
    }

    let mut observed_sum = 0.0_f64;
    let mut marginal = [0_usize; 3];
    let mut rating_total = 0_usize;

    for counts in &rated {
        let n = counts.total();
        let agreeing_pairs = counts
            .as_array()
            .iter()
            .map(|count| count * count.saturating_sub(1))
            .sum::<usize>();
        observed_sum += agreeing_pairs as f64 / (n * (n - 1)) as f64;

        for (slot, count) in marginal.iter_mut().zip(counts.as_array()) {
            *slot += count;
        }
        rating_total += n;
    }

    let observed_agreement = observed_sum / rated.len() as f64;
    let chance_agreement = marginal
        .iter()
        .map(|count| {
            let proportion = *count as f64 / rating_total as f64;
            proportion * proportion
        })
        .sum::<f64>();

    if 1.0 - chance_agreement <= f64::EPSILON {
        return None;
    }

    Some((observed_agreement - chance_agreement) / (1.0 - chance_agreement))
}
