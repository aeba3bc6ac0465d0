use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::ReportArgs;
use crate::metrics::{LanguageSource, ProgressRow, progress};

use super::sources::{LoadedBase, SourceContext};
use super::{PROGRESS_REPORT, render, report_stamp, write_report};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressOutcome {
    Tracked { row: ProgressRow },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageProgress {
    pub language: String,
    #[serde(flatten)]
    pub outcome: ProgressOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub languages: Vec<LanguageProgress>,
}

pub fn run(args: ReportArgs) -> Result<()> {
    let context = SourceContext::prepare(&args.sources)?;
    let loaded = context.load_languages();
    let bases = context.load_bases();

    let report = build(&loaded.sources, &bases);
    let stamp = report_stamp(&args);
    let markdown = render::progress_markdown(&context, &report, stamp.as_deref())?;

    write_report(
        &context.reports_dir(args.reports_dir.as_deref()),
        PROGRESS_REPORT,
        &markdown,
        args.json.then_some(&report),
    )?;
    log_summary(&report);

    Ok(())
}

pub fn build(sources: &[LanguageSource], bases: &[LoadedBase]) -> ProgressReport {
    let mut languages = sources
        .iter()
        .map(|source| {
            let outcome = match (source, base_item_count(bases, source.language())) {
                (LanguageSource::Loaded(submission), Ok(total)) => ProgressOutcome::Tracked {
                    row: progress(total, submission),
                },
                (LanguageSource::Loaded(_), Err(reason)) => ProgressOutcome::Unavailable { reason },
                (LanguageSource::Missing { .. }, _) => ProgressOutcome::Unavailable {
                    reason: "annotations missing".to_string(),
                },
                (LanguageSource::Invalid { reason, .. }, _) => ProgressOutcome::Unavailable {
                    reason: format!("annotations invalid: {reason}"),
                },
            };
            LanguageProgress {
                language: source.language().to_string(),
                outcome,
            }
        })
        .collect::<Vec<LanguageProgress>>();
    languages.sort_by(|left, right| left.language.cmp(&right.language));

    ProgressReport { languages }
}

fn base_item_count(bases: &[LoadedBase], language: &str) -> std::result::Result<usize, String> {
    let Some(base) = bases.iter().find(|base| base.language == language) else {
        return Err("base dataset missing".to_string());
    };
    match (base.item_count, &base.record.error) {
        (Some(count), _) => Ok(count),
        (None, Some(error)) => Err(format!("base dataset invalid: {error}")),
        (None, None) => Err("base dataset missing".to_string()),
    }
}

pub(super) fn log_summary(report: &ProgressReport) {
    let tracked = report
        .languages
        .iter()
        .filter(|entry| matches!(entry.outcome, ProgressOutcome::Tracked { .. }))
        .count();
    info!(
        languages = report.languages.len(),
        tracked,
        "progress completed"
    );
}
