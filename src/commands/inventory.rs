use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::table::read_csv_table;
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

use super::sources::{SourceContext, SourceKind};

#[derive(Debug, Clone, Serialize)]
pub struct SourceInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub data_root: String,
    pub source_count: usize,
    pub missing_count: usize,
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceEntry {
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub path: String,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// Data rows below the header; absent when the file is not readable CSV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

pub fn run(args: InventoryArgs) -> Result<()> {
    let context = SourceContext::prepare(&args.sources)?;
    let manifest = build_manifest(&context)?;

    if args.dry_run {
        info!(
            source_count = manifest.source_count,
            missing_count = manifest.missing_count,
            data_root = %manifest.data_root,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| default_manifest_path(&context.data_root));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(
        source_count = manifest.source_count,
        missing_count = manifest.missing_count,
        "inventory completed"
    );

    Ok(())
}

pub fn build_manifest(context: &SourceContext) -> Result<SourceInventoryManifest> {
    let root = &context.data_root;
    let config = &context.config;

    let mut candidates = vec![
        (SourceKind::Gold, None, config.gold_path(root)),
        (SourceKind::Phenomena, None, config.phenomena_path(root)),
    ];
    for code in &context.languages {
        candidates.push((
            SourceKind::Annotations,
            Some(code.clone()),
            context.annotation_path(code),
        ));
        candidates.push((
            SourceKind::Base,
            Some(code.clone()),
            config.base_path(root, code),
        ));
    }

    let mut sources = Vec::with_capacity(candidates.len());
    for (kind, language, path) in candidates {
        sources.push(inspect_source(kind, language, &path)?);
    }
    sources.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then(a.language.cmp(&b.language))
            .then(a.path.cmp(&b.path))
    });

    let source_count = sources.iter().filter(|entry| entry.present).count();
    if source_count == 0 {
        bail!("no sources found under {}", root.display());
    }

    Ok(SourceInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        data_root: root.display().to_string(),
        source_count,
        missing_count: sources.len() - source_count,
        sources,
    })
}

fn inspect_source(kind: SourceKind, language: Option<String>, path: &Path) -> Result<SourceEntry> {
    let mut entry = SourceEntry {
        kind,
        language,
        path: path.display().to_string(),
        present: false,
        sha256: None,
        bytes: None,
        rows: None,
    };
    if !path.is_file() {
        return Ok(entry);
    }

    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to inspect file: {}", path.display()))?;
    entry.present = true;
    entry.bytes = Some(metadata.len());
    entry.sha256 = Some(sha256_file(path)?);
    entry.rows = match read_csv_table(path) {
        Ok(table) => Some(table.row_count()),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "source is not readable csv");
            None
        }
    };

    Ok(entry)
}

/// Default manifest location for a data root.
pub fn default_manifest_path(data_root: &Path) -> PathBuf {
    data_root.join("manifests").join("source_inventory.json")
}
