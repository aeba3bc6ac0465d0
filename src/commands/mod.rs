pub mod agreement;
pub mod evaluate;
pub mod inventory;
pub mod phenomena;
pub mod progress;
pub mod report;

mod render;
mod sources;


use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::ReportArgs;
use crate::util::{now_utc_string, write_json_pretty, write_text};

pub const EVALUATION_REPORT: &str = "evaluation.md";
pub const AGREEMENT_REPORT: &str = "inter_annotator_agreement.md";
pub const PHENOMENA_REPORT: &str = "Phenomena_Report.md";
pub const PROGRESS_REPORT: &str = "progress.md";

/// Writes `<file_name>` and, when `structured` is given, a `.json` sibling.
/// Returns every path written.
fn write_report<T: Serialize>(
    reports_dir: &Path,
    file_name: &str,
    markdown: &str,
    structured: Option<&T>,
) -> Result<Vec<PathBuf>> {
    let markdown_path = reports_dir.join(file_name);
    write_text(&markdown_path, markdown)?;
    info!(path = %markdown_path.display(), "wrote report");

    let mut written = vec![markdown_path];
    if let Some(value) = structured {
        let json_path = reports_dir.join(file_name).with_extension("json");
        write_json_pretty(&json_path, value)?;
        info!(path = %json_path.display(), "wrote structured report");
        written.push(json_path);
    }

    Ok(written)
}

fn report_stamp(args: &ReportArgs) -> Option<String> {
    args.timestamp.then(now_utc_string)
}
