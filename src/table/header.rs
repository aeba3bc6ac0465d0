use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub needle: &'static str,
    pub required: bool,
}

impl ColumnSpec {
    const fn required(field: &'static str, needle: &'static str) -> Self {
        Self {
            field,
            needle,
            required: true,
        }
    }

    const fn optional(field: &'static str, needle: &'static str) -> Self {
        Self {
            field,
            needle,
            required: false,
        }
    }
}

pub const ANNOTATION_SCHEMA: [ColumnSpec; 4] = [
    ColumnSpec::required("id", "id"),
    ColumnSpec::optional("premise", "premise"),
    ColumnSpec::optional("hypothesis", "hypothesis"),
    ColumnSpec::required("relation", "relation"),
];

pub const GOLD_SCHEMA: [ColumnSpec; 2] = [
    ColumnSpec::required("id", "id"),
    ColumnSpec::required("annotation", "annotation"),
];

pub const BASE_SCHEMA: [ColumnSpec; 1] = [ColumnSpec::required("id", "id")];

pub const PHENOMENON_SCHEMA: [ColumnSpec; 2] = [
    ColumnSpec::required("id", "id"),
    ColumnSpec::required("phenomenon", "phenomenon"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    columns: Vec<(&'static str, Option<usize>)>,
}

impl ColumnMap {
    pub fn get(&self, field: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(name, _)| *name == field)
            .and_then(|(_, column)| *column)
    }

    pub fn require(&self, source_name: &str, field: &str) -> Result<usize> {
        self.get(field)
            .ok_or_else(|| EngineError::schema(source_name, field))
    }
}

/// Locates every schema field in `headers`, case-insensitively.
///
/// Exact header matches are claimed first; remaining fields then take the
/// first unclaimed header that contains their needle, so an `ID` column is
/// never stolen by a longer header that happens to contain "id".
pub fn resolve_columns(
    source_name: &str,
    headers: &[String],
    schema: &[ColumnSpec],
) -> Result<ColumnMap> {
    let normalized = headers
        .iter()
        .map(|header| normalize_header(header))
        .collect::<Vec<String>>();

    let mut claimed = vec![false; normalized.len()];
    let mut resolved = vec![None::<usize>; schema.len()];

    for (slot, spec) in schema.iter().enumerate() {
        if let Some(column) = (0..normalized.len())
            .find(|column| !claimed[*column] && normalized[*column] == spec.needle)
        {
            claimed[column] = true;
            resolved[slot] = Some(column);
        }
    }

    for (slot, spec) in schema.iter().enumerate() {
        if resolved[slot].is_some() {
            continue;
        }
        if let Some(column) = (0..normalized.len())
            .find(|column| !claimed[*column] && normalized[*column].contains(spec.needle))
        {
            claimed[column] = true;
            resolved[slot] = Some(column);
        }
    }

    for (slot, spec) in schema.iter().enumerate() {
        if spec.required && resolved[slot].is_none() {
            return Err(EngineError::schema(source_name, spec.field));
        }
    }

    Ok(ColumnMap {
        columns: schema
            .iter()
            .zip(resolved)
            .map(|(spec, column)| (spec.field, column))
            .collect(),
    })
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}
