use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

pub const UNKNOWN_PHENOMENON: &str = "unknown";

/// Substantive NLI relation. Declaration order is the canonical order used
/// for tie-breaking and table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Entailment,
    Contradiction,
    Neutral,
}

pub const SUBSTANTIVE_LABELS: [Label; 3] = [Label::Entailment, Label::Contradiction, Label::Neutral];

impl Label {
    /// Exact, case-sensitive match after trimming surrounding whitespace.
    pub fn parse(value: &str) -> Option<Label> {
        match value.trim() {
            "Entailment" => Some(Label::Entailment),
            "Contradiction" => Some(Label::Contradiction),
            "Neutral" => Some(Label::Neutral),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entailment => "Entailment",
            Self::Contradiction => "Contradiction",
            Self::Neutral => "Neutral",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Entailment => 0,
            Self::Contradiction => 1,
            Self::Neutral => 2,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictedLabel {
    Entailment,
    Contradiction,
    Neutral,
    /// Sentinel values ("NonSense"), blanks and anything unmapped.
    Excluded,
}

impl PredictedLabel {
    pub fn normalize(raw: &str) -> Self {
        Label::parse(raw)
            .map(PredictedLabel::from)
            .unwrap_or(PredictedLabel::Excluded)
    }

    pub fn substantive(self) -> Option<Label> {
        match self {
            Self::Entailment => Some(Label::Entailment),
            Self::Contradiction => Some(Label::Contradiction),
            Self::Neutral => Some(Label::Neutral),
            Self::Excluded => None,
        }
    }

    pub fn is_excluded(self) -> bool {
        self == Self::Excluded
    }
}

impl From<Label> for PredictedLabel {
    fn from(label: Label) -> Self {
        match label {
            Label::Entailment => Self::Entailment,
            Label::Contradiction => Self::Contradiction,
            Label::Neutral => Self::Neutral,
        }
    }
}

/// Trimmed, non-empty item identifier. Purely numeric ids sort by value
/// ("2" before "10") and ahead of non-numeric ids, which sort lexically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse::<u64>().ok()
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(left), Some(right)) => left.cmp(&right).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub entailment: usize,
    pub contradiction: usize,
    pub neutral: usize,
}

impl LabelCounts {
    pub fn add(&mut self, label: Label) {
        *self.slot_mut(label) += 1;
    }

    pub fn get(&self, label: Label) -> usize {
        self.as_array()[label.index()]
    }

    pub fn total(&self) -> usize {
        self.entailment + self.contradiction + self.neutral
    }

    pub fn as_array(&self) -> [usize; 3] {
        [self.entailment, self.contradiction, self.neutral]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, usize)> + '_ {
        SUBSTANTIVE_LABELS
            .iter()
            .map(move |label| (*label, self.get(*label)))
    }

    fn slot_mut(&mut self, label: Label) -> &mut usize {
        match label {
            Label::Entailment => &mut self.entailment,
            Label::Contradiction => &mut self.contradiction,
            Label::Neutral => &mut self.neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRecord {
    pub item_id: ItemId,
    pub predicted: PredictedLabel,
    pub premise: Option<String>,
    pub hypothesis: Option<String>,
}

impl AnnotationRecord {
    pub fn new(item_id: ItemId, predicted: PredictedLabel) -> Self {
        Self {
            item_id,
            predicted,
            premise: None,
            hypothesis: None,
        }
    }
}

/// One language's records, at most one per item. When an item id repeats,
/// the later record replaces the earlier one in the earlier one's position.
#[derive(Debug, Clone)]
pub struct AnnotatorSubmission {
    language: String,
    records: Vec<AnnotationRecord>,
    positions: HashMap<ItemId, usize>,
    duplicates_replaced: usize,
}

impl AnnotatorSubmission {
    pub fn new(language: impl Into<String>, records: Vec<AnnotationRecord>) -> Self {
        let mut kept = Vec::<AnnotationRecord>::with_capacity(records.len());
        let mut positions = HashMap::<ItemId, usize>::with_capacity(records.len());
        let mut duplicates_replaced = 0;

        for record in records {
            match positions.get(&record.item_id) {
                Some(&position) => {
                    kept[position] = record;
                    duplicates_replaced += 1;
                }
                None => {
                    positions.insert(record.item_id.clone(), kept.len());
                    kept.push(record);
                }
            }
        }

        Self {
            language: language.into(),
            records: kept,
            positions,
            duplicates_replaced,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn duplicates_replaced(&self) -> usize {
        self.duplicates_replaced
    }

    pub fn prediction(&self, item_id: &ItemId) -> Option<PredictedLabel> {
        self.positions
            .get(item_id)
            .map(|position| self.records[*position].predicted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoldStandard {
    labels: BTreeMap<ItemId, Label>,
}

impl GoldStandard {
    pub fn new(labels: BTreeMap<ItemId, Label>) -> Self {
        Self { labels }
    }

    pub fn get(&self, item_id: &ItemId) -> Option<Label> {
        self.labels.get(item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, Label)> + '_ {
        self.labels.iter().map(|(item_id, label)| (item_id, *label))
    }
}

impl FromIterator<(ItemId, Label)> for GoldStandard {
    fn from_iter<T: IntoIterator<Item = (ItemId, Label)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhenomenonMap {
    tags: HashMap<ItemId, String>,
}

impl PhenomenonMap {
    pub fn insert(&mut self, item_id: ItemId, raw_tag: &str) {
        self.tags.insert(item_id, normalize_phenomenon(raw_tag));
    }

    pub fn tag(&self, item_id: &ItemId) -> &str {
        self.tags
            .get(item_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_PHENOMENON)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<'a> FromIterator<(ItemId, &'a str)> for PhenomenonMap {
    fn from_iter<T: IntoIterator<Item = (ItemId, &'a str)>>(iter: T) -> Self {
        let mut map = Self::default();
        for (item_id, raw_tag) in iter {
            map.insert(item_id, raw_tag);
        }
        map
    }
}

pub fn normalize_phenomenon(raw: &str) -> String {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        UNKNOWN_PHENOMENON.to_string()
    } else {
        normalized
    }
}
