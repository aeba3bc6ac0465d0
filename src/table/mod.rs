//! Tabular ingestion: header row + data rows in, canonical records out.
//! Only `read_csv_table` touches the filesystem.

mod annotations;
mod csv_source;
mod header;
mod reference;

pub use annotations::{IngestOutcome, count_items, ingest_annotations};
pub use csv_source::read_csv_table;
pub use header::{
    ANNOTATION_SCHEMA, BASE_SCHEMA, ColumnMap, ColumnSpec, GOLD_SCHEMA, PHENOMENON_SCHEMA, resolve_columns,
};
pub use reference::{ParsedGold, ParsedPhenomena, parse_gold_standard, parse_phenomenon_map};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// First row becomes the header. An empty input yields a table with no
    /// columns, which then fails column resolution.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let headers = rows.remove(0);
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(|value| value.trim()).unwrap_or("")
}
