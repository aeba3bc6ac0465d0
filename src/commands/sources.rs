use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::SourceArgs;
use crate::config::{ProjectConfig, load_config};
use crate::error::{self, EngineError};
use crate::metrics::LanguageSource;
use crate::model::{AnnotatorSubmission, GoldStandard, PhenomenonMap};
use crate::table::{
    count_items, ingest_annotations, parse_gold_standard, parse_phenomenon_map, read_csv_table,
};
use crate::util::sha256_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Gold,
    Phenomena,
    Annotations,
    Base,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded,
    Missing,
    Invalid,
}

/// What happened to one input file; feeds the run manifest and inventory.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub path: String,
    pub status: SourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub rows: usize,
    pub records: usize,
    pub skipped_rows: usize,
    pub duplicates_replaced: usize,
    pub excluded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceRecord {
    fn missing(kind: SourceKind, language: Option<&str>, path: &Path) -> Self {
        Self {
            kind,
            language: language.map(ToOwned::to_owned),
            path: path.display().to_string(),
            status: SourceStatus::Missing,
            sha256: None,
            rows: 0,
            records: 0,
            skipped_rows: 0,
            duplicates_replaced: 0,
            excluded: 0,
            error: None,
        }
    }

    fn loaded(kind: SourceKind, language: Option<&str>, path: &Path) -> Self {
        Self {
            status: SourceStatus::Loaded,
            sha256: hash_source(path),
            ..Self::missing(kind, language, path)
        }
    }

    fn invalid(kind: SourceKind, language: Option<&str>, path: &Path, err: &EngineError) -> Self {
        Self {
            status: SourceStatus::Invalid,
            error: Some(err.to_string()),
            ..Self::missing(kind, language, path)
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadedLanguages {
    pub sources: Vec<LanguageSource>,
    pub records: Vec<SourceRecord>,
}

#[derive(Debug)]
pub struct LoadedBase {
    pub language: String,
    pub item_count: Option<usize>,
    pub record: SourceRecord,
}

/// Resolved configuration plus the sorted language codes for one run.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub data_root: PathBuf,
    pub config: ProjectConfig,
    pub languages: Vec<String>,
    /// Upper-cased code to the annotation file actually present on disk.
    pub annotation_files: BTreeMap<String, PathBuf>,
}

impl SourceContext {
    pub fn prepare(args: &SourceArgs) -> Result<Self> {
        let config = load_config(&args.data_root, args.config.as_deref())?;

        let annotation_files = discover_languages(&config.annotations_dir(&args.data_root))?;
        let discovered = if config.discover_languages {
            annotation_files.keys().cloned().collect()
        } else {
            BTreeSet::new()
        };
        let languages = select_languages(&config, &args.languages, &discovered);

        info!(
            data_root = %args.data_root.display(),
            languages = %languages.join(","),
            discovered = discovered.len(),
            "resolved languages"
        );

        Ok(Self {
            data_root: args.data_root.clone(),
            config,
            languages,
            annotation_files,
        })
    }

    /// The file found on disk for `code`, whatever its casing, else the
    /// configured `annotations_<CODE>.csv` path.
    pub fn annotation_path(&self, code: &str) -> PathBuf {
        self.annotation_files
            .get(code)
            .cloned()
            .unwrap_or_else(|| self.config.annotation_path(&self.data_root, code))
    }

    pub fn reports_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.reports_dir(&self.data_root))
    }

    pub fn language_label(&self, code: &str) -> String {
        let name = self.config.language_name(code);
        if name == code {
            code.to_string()
        } else {
            format!("{name} ({code})")
        }
    }

    pub fn load_languages(&self) -> LoadedLanguages {
        let mut loaded = LoadedLanguages::default();
        for code in &self.languages {
            let (source, record) = self.load_language(code);
            loaded.sources.push(source);
            loaded.records.push(record);
        }
        loaded
    }

    fn load_language(&self, code: &str) -> (LanguageSource, SourceRecord) {
        let path = self.annotation_path(code);

        match read_submission(code, &path) {
            Ok((submission, rows, skipped_rows)) => {
                let excluded = submission
                    .records()
                    .iter()
                    .filter(|record| record.predicted.is_excluded())
                    .count();
                if submission.duplicates_replaced() > 0 {
                    warn!(
                        language = code,
                        duplicates = submission.duplicates_replaced(),
                        "duplicate item ids replaced by later rows"
                    );
                }
                info!(
                    language = code,
                    path = %path.display(),
                    rows,
                    records = submission.len(),
                    dropped = skipped_rows,
                    excluded,
                    "loaded annotations"
                );

                let record = SourceRecord {
                    rows,
                    records: submission.len(),
                    skipped_rows,
                    duplicates_replaced: submission.duplicates_replaced(),
                    excluded,
                    ..SourceRecord::loaded(SourceKind::Annotations, Some(code), &path)
                };
                (LanguageSource::Loaded(submission), record)
            }
            Err(EngineError::SourceMissing { .. }) => {
                warn!(language = code, path = %path.display(), "annotation file missing");
                (
                    LanguageSource::Missing {
                        language: code.to_string(),
                    },
                    SourceRecord::missing(SourceKind::Annotations, Some(code), &path),
                )
            }
            Err(err) => {
                warn!(
                    language = code,
                    path = %path.display(),
                    error = %err,
                    "annotation file skipped"
                );
                (
                    LanguageSource::Invalid {
                        language: code.to_string(),
                        reason: err.to_string(),
                    },
                    SourceRecord::invalid(SourceKind::Annotations, Some(code), &path, &err),
                )
            }
        }
    }

    pub fn load_gold(&self) -> Result<(GoldStandard, SourceRecord)> {
        let path = self.config.gold_path(&self.data_root);
        if !path.is_file() {
            bail!("gold standard not found: {}", path.display());
        }

        let table = read_csv_table(&path)
            .with_context(|| format!("failed to read gold standard {}", path.display()))?;
        let parsed = parse_gold_standard(&source_name(&path), &table)
            .with_context(|| format!("failed to parse gold standard {}", path.display()))?;

        info!(
            path = %path.display(),
            items = parsed.gold.len(),
            skipped = parsed.skipped_rows,
            "loaded gold standard"
        );

        let record = SourceRecord {
            rows: table.row_count(),
            records: parsed.gold.len(),
            skipped_rows: parsed.skipped_rows,
            ..SourceRecord::loaded(SourceKind::Gold, None, &path)
        };
        Ok((parsed.gold, record))
    }

    pub fn load_phenomena(&self) -> Result<(PhenomenonMap, SourceRecord)> {
        let path = self.config.phenomena_path(&self.data_root);
        if !path.is_file() {
            bail!("phenomenon table not found: {}", path.display());
        }

        let table = read_csv_table(&path)
            .with_context(|| format!("failed to read phenomenon table {}", path.display()))?;
        let parsed = parse_phenomenon_map(&source_name(&path), &table)
            .with_context(|| format!("failed to parse phenomenon table {}", path.display()))?;

        info!(
            path = %path.display(),
            items = parsed.map.len(),
            skipped = parsed.skipped_rows,
            "loaded phenomenon table"
        );

        let record = SourceRecord {
            rows: table.row_count(),
            records: parsed.map.len(),
            skipped_rows: parsed.skipped_rows,
            ..SourceRecord::loaded(SourceKind::Phenomena, None, &path)
        };
        Ok((parsed.map, record))
    }

    pub fn load_bases(&self) -> Vec<LoadedBase> {
        self.languages
            .iter()
            .map(|code| self.load_base(code))
            .collect()
    }

    fn load_base(&self, code: &str) -> LoadedBase {
        let path = self.config.base_path(&self.data_root, code);
        if !path.is_file() {
            warn!(language = code, path = %path.display(), "base dataset missing");
            return LoadedBase {
                language: code.to_string(),
                item_count: None,
                record: SourceRecord::missing(SourceKind::Base, Some(code), &path),
            };
        }

        let counted = read_csv_table(&path).and_then(|table| {
            count_items(&source_name(&path), &table).map(|items| (table.row_count(), items))
        });
        match counted {
            Ok((rows, items)) => {
                debug!(language = code, path = %path.display(), items, "counted base dataset");
                LoadedBase {
                    language: code.to_string(),
                    item_count: Some(items),
                    record: SourceRecord {
                        rows,
                        records: items,
                        ..SourceRecord::loaded(SourceKind::Base, Some(code), &path)
                    },
                }
            }
            Err(err) => {
                warn!(
                    language = code,
                    path = %path.display(),
                    error = %err,
                    "base dataset skipped"
                );
                LoadedBase {
                    language: code.to_string(),
                    item_count: None,
                    record: SourceRecord::invalid(SourceKind::Base, Some(code), &path, &err),
                }
            }
        }
    }
}

/// Returns (submission, data rows, rows dropped for a blank id).
fn read_submission(
    code: &str,
    path: &Path,
) -> error::Result<(AnnotatorSubmission, usize, usize)> {
    if !path.is_file() {
        return Err(EngineError::source_missing(code));
    }

    let table = read_csv_table(path)?;
    let outcome = ingest_annotations(&source_name(path), &table)?;
    let submission = AnnotatorSubmission::new(code, outcome.records);
    Ok((submission, table.row_count(), outcome.dropped_missing_id))
}

/// Upper-cased language codes mapped to their `annotations_<code>.csv` file.
/// When several casings exist, the upper-case file name wins.
pub fn discover_languages(annotations_dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut codes = BTreeMap::new();
    if !annotations_dir.is_dir() {
        debug!(path = %annotations_dir.display(), "annotations directory not found");
        return Ok(codes);
    }

    let pattern = Regex::new(r"^annotations_([A-Za-z]+)\.csv$")
        .context("failed to compile annotation filename regex")?;

    let entries = fs::read_dir(annotations_dir)
        .with_context(|| format!("failed to read {}", annotations_dir.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", annotations_dir.display()))?;
        let Some(filename) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        let Some(code) = pattern
            .captures(&filename)
            .and_then(|captures| captures.get(1))
            .map(|code| code.as_str().to_ascii_uppercase())
        else {
            continue;
        };

        let canonical = filename == format!("annotations_{code}.csv");
        match codes.entry(code) {
            Entry::Vacant(slot) => {
                slot.insert(entry.path());
            }
            Entry::Occupied(mut slot) if canonical => {
                slot.insert(entry.path());
            }
            Entry::Occupied(_) => {}
        }
    }

    Ok(codes)
}

/// Explicit `--lang` codes win; otherwise configured plus discovered codes.
pub fn select_languages(
    config: &ProjectConfig,
    requested: &[String],
    discovered: &BTreeSet<String>,
) -> Vec<String> {
    let requested = requested
        .iter()
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .collect::<BTreeSet<String>>();
    if !requested.is_empty() {
        return requested.into_iter().collect();
    }

    config
        .languages
        .keys()
        .cloned()
        .chain(discovered.iter().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| path.display().to_string())
}

fn hash_source(path: &Path) -> Option<String> {
    match sha256_file(path) {
        Ok(digest) => Some(digest),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to hash source");
            None
        }
    }
}
