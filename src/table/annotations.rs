use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{AnnotationRecord, ItemId, PredictedLabel};

use super::{ANNOTATION_SCHEMA, BASE_SCHEMA, RawTable, cell, resolve_columns};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub records: Vec<AnnotationRecord>,
    pub dropped_missing_id: usize,
}

impl IngestOutcome {
    pub fn excluded_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.predicted.is_excluded())
            .count()
    }
}

pub fn ingest_annotations(source_name: &str, table: &RawTable) -> Result<IngestOutcome> {
    let columns = resolve_columns(source_name, &table.headers, &ANNOTATION_SCHEMA)?;
    let id_column = columns.require(source_name, "id")?;
    let relation_column = columns.require(source_name, "relation")?;
    let premise_column = columns.get("premise");
    let hypothesis_column = columns.get("hypothesis");

    let mut outcome = IngestOutcome {
        records: Vec::with_capacity(table.rows.len()),
        dropped_missing_id: 0,
    };

    for row in &table.rows {
        let Some(item_id) = ItemId::new(cell(row, id_column)) else {
            outcome.dropped_missing_id += 1;
            continue;
        };

        outcome.records.push(AnnotationRecord {
            item_id,
            predicted: PredictedLabel::normalize(cell(row, relation_column)),
            premise: premise_column.map(|column| cell(row, column).to_string()),
            hypothesis: hypothesis_column.map(|column| cell(row, column).to_string()),
        });
    }

    Ok(outcome)
}

/// Distinct non-blank item ids in a base dataset table.
pub fn count_items(source_name: &str, table: &RawTable) -> Result<usize> {
    let columns = resolve_columns(source_name, &table.headers, &BASE_SCHEMA)?;
    let id_column = columns.require(source_name, "id")?;

    let ids = table
        .rows
        .iter()
        .filter_map(|row| ItemId::new(cell(row, id_column)))
        .collect::<BTreeSet<ItemId>>();
    Ok(ids.len())
}
