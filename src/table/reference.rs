use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::model::{GoldStandard, ItemId, Label, PhenomenonMap};

use super::{GOLD_SCHEMA, PHENOMENON_SCHEMA, RawTable, cell, resolve_columns};

#[derive(Debug, Clone)]
pub struct ParsedGold {
    pub gold: GoldStandard,
    pub skipped_rows: usize,
}

#[derive(Debug, Clone)]
pub struct ParsedPhenomena {
    pub map: PhenomenonMap,
    pub skipped_rows: usize,
}

/// Rows with a blank id or blank label are skipped. Any other label that is
/// not one of the three substantive classes rejects the whole table, as
/// does a table with no usable rows.
pub fn parse_gold_standard(source_name: &str, table: &RawTable) -> Result<ParsedGold> {
    let columns = resolve_columns(source_name, &table.headers, &GOLD_SCHEMA)?;
    let id_column = columns.require(source_name, "id")?;
    let label_column = columns.require(source_name, "annotation")?;

    let mut labels = BTreeMap::<ItemId, Label>::new();
    let mut skipped_rows = 0;

    for (index, row) in table.rows.iter().enumerate() {
        let raw_label = cell(row, label_column);
        let Some(item_id) = ItemId::new(cell(row, id_column)) else {
            skipped_rows += 1;
            continue;
        };
        if raw_label.is_empty() {
            skipped_rows += 1;
            continue;
        }

        let label = Label::parse(raw_label).ok_or_else(|| EngineError::InvalidGoldLabel {
            row: index + 2,
            value: raw_label.to_string(),
        })?;
        labels.insert(item_id, label);
    }

    if labels.is_empty() {
        return Err(EngineError::empty_input(format!(
            "{source_name} contains no labelled items"
        )));
    }

    Ok(ParsedGold {
        gold: GoldStandard::new(labels),
        skipped_rows,
    })
}

pub fn parse_phenomenon_map(source_name: &str, table: &RawTable) -> Result<ParsedPhenomena> {
    let columns = resolve_columns(source_name, &table.headers, &PHENOMENON_SCHEMA)?;
    let id_column = columns.require(source_name, "id")?;
    let tag_column = columns.require(source_name, "phenomenon")?;

    let mut map = PhenomenonMap::default();
    let mut skipped_rows = 0;

    for row in &table.rows {
        match ItemId::new(cell(row, id_column)) {
            Some(item_id) => map.insert(item_id, cell(row, tag_column)),
            None => skipped_rows += 1,
        }
    }

    Ok(ParsedPhenomena { map, skipped_rows })
}
