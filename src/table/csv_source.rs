use std::path::Path;

use crate::error::Result;

use super::RawTable;

/// Reads a whole CSV file as strings. Rows may be ragged; short rows read as
/// blank cells downstream.
pub fn read_csv_table(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    Ok(RawTable::from_rows(rows))
}
