use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{
    AnnotatorSubmission, GoldStandard, ItemId, Label, LabelCounts, PhenomenonMap,
    SUBSTANTIVE_LABELS, normalize_phenomenon,
};
use crate::stats::{Association, ContingencyTable, associate};

use super::rate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhenomenonRow {
    pub language: String,
    pub phenomenon: String,
    pub sample_count: usize,
    pub matched_count: usize,
    pub accuracy: f64,
    pub label_counts: LabelCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhenomenonBreakdown {
    pub language: String,
    pub rows: Vec<PhenomenonRow>,
    /// Mean accuracy over rows that have samples.
    pub average_accuracy: Option<f64>,
    /// Phenomenon × predicted-label independence test.
    pub effect: Option<Association>,
}

/// One row per (language, phenomenon), languages sorted, phenomena in the
/// requested order. Only gold items count; an item tagged nowhere is
/// "unknown" and matches only when "unknown" is requested.
pub fn breakdown(
    gold: &GoldStandard,
    phenomena: &PhenomenonMap,
    submissions: &[&AnnotatorSubmission],
    phenomena_of_interest: &[String],
) -> Vec<PhenomenonRow> {
    let requested = dedup_phenomena(phenomena_of_interest);

    let mut items_by_phenomenon = BTreeMap::<&str, Vec<(&ItemId, Label)>>::new();
    for (item_id, label) in gold.iter() {
        items_by_phenomenon
            .entry(phenomena.tag(item_id))
            .or_default()
            .push((item_id, label));
    }

    let mut ordered = submissions.to_vec();
    ordered.sort_by(|left, right| left.language().cmp(right.language()));

    let mut rows = Vec::<PhenomenonRow>::with_capacity(ordered.len() * requested.len());
    for submission in ordered {
        for phenomenon in &requested {
            let mut label_counts = LabelCounts::default();
            let mut matched_count = 0;

            let items = items_by_phenomenon
                .get(phenomenon.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            for (item_id, gold_label) in items {
                let Some(predicted) = submission
                    .prediction(item_id)
                    .and_then(|predicted| predicted.substantive())
                else {
                    continue;
                };
                label_counts.add(predicted);
                if predicted == *gold_label {
                    matched_count += 1;
                }
            }

            let sample_count = label_counts.total();
            rows.push(PhenomenonRow {
                language: submission.language().to_string(),
                phenomenon: phenomenon.clone(),
                sample_count,
                matched_count,
                accuracy: rate(matched_count, sample_count),
                label_counts,
            });
        }
    }

    rows
}

/// Groups rows per language and adds the per-language summaries.
pub fn breakdown_languages(rows: &[PhenomenonRow]) -> Vec<PhenomenonBreakdown> {
    let mut grouped = BTreeMap::<&str, Vec<PhenomenonRow>>::new();
    for row in rows {
        grouped
            .entry(row.language.as_str())
            .or_default()
            .push(row.clone());
    }

    grouped
        .into_iter()
        .map(|(language, rows)| PhenomenonBreakdown {
            language: language.to_string(),
            average_accuracy: average_accuracy(&rows),
            effect: phenomenon_effect(&rows),
            rows,
        })
        .collect()
}

pub fn average_accuracy(rows: &[PhenomenonRow]) -> Option<f64> {
    let sampled = rows
        .iter()
        .filter(|row| row.sample_count > 0)
        .collect::<Vec<&PhenomenonRow>>();
    if sampled.is_empty() {
        return None;
    }
    Some(sampled.iter().map(|row| row.accuracy).sum::<f64>() / sampled.len() as f64)
}

/// Needs at least two phenomena with samples.
pub fn phenomenon_effect(rows: &[PhenomenonRow]) -> Option<Association> {
    let sampled = rows
        .iter()
        .filter(|row| row.sample_count > 0)
        .collect::<Vec<&PhenomenonRow>>();
    if sampled.len() < 2 {
        return None;
    }

    let mut table = ContingencyTable::new(
        sampled.iter().map(|row| row.phenomenon.clone()).collect(),
        SUBSTANTIVE_LABELS
            .iter()
            .map(|label| label.to_string())
            .collect(),
    );
    for (row_index, row) in sampled.iter().enumerate() {
        for (label, count) in row.label_counts.iter() {
            table.add(row_index, label.index(), count as u64);
        }
    }

    Some(associate(&table))
}

/// Sorted distinct tags of gold items, "unknown" included when present.
pub fn observed_phenomena(gold: &GoldStandard, phenomena: &PhenomenonMap) -> Vec<String> {
    gold.iter()
        .map(|(item_id, _)| phenomena.tag(item_id).to_string())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Normalized, first occurrence kept.
pub fn dedup_phenomena(requested: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::<String>::new();
    requested
        .iter()
        .map(|phenomenon| normalize_phenomenon(phenomenon))
        .filter(|phenomenon| seen.insert(phenomenon.clone()))
        .collect()
}
