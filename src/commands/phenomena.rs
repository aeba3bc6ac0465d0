use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::PhenomenaArgs;
use crate::metrics::{
    LanguageSource, PhenomenonBreakdown, UnavailableSource, breakdown, breakdown_languages,
    dedup_phenomena, loaded_submissions, observed_phenomena, unavailable_sources,
};
use crate::model::{GoldStandard, PhenomenonMap};

use super::sources::SourceContext;
use super::{PHENOMENA_REPORT, render, report_stamp, write_report};

#[derive(Debug, Clone, Serialize)]
pub struct PhenomenaReport {
    pub phenomena: Vec<String>,
    pub languages: Vec<PhenomenonBreakdown>,
    pub unavailable: Vec<UnavailableSource>,
}

pub fn run(args: PhenomenaArgs) -> Result<()> {
    let context = SourceContext::prepare(&args.report.sources)?;
    let (gold, _) = context.load_gold()?;
    let (phenomena, _) = context.load_phenomena()?;
    let loaded = context.load_languages();

    let requested = requested_phenomena(
        &context.config.phenomena,
        &args.phenomena,
        args.all_phenomena,
        &gold,
        &phenomena,
    );
    let report = build(&gold, &phenomena, &loaded.sources, requested);
    let stamp = report_stamp(&args.report);
    let markdown = render::phenomena_markdown(&context, &report, stamp.as_deref())?;

    write_report(
        &context.reports_dir(args.report.reports_dir.as_deref()),
        PHENOMENA_REPORT,
        &markdown,
        args.report.json.then_some(&report),
    )?;
    log_summary(&report);

    Ok(())
}

/// `--all-phenomena` takes every tag seen on a gold item, then explicit
/// `--phenomenon` values, then the configured list.
pub fn requested_phenomena(
    configured: &[String],
    explicit: &[String],
    all: bool,
    gold: &GoldStandard,
    phenomena: &PhenomenonMap,
) -> Vec<String> {
    if all {
        observed_phenomena(gold, phenomena)
    } else if !explicit.is_empty() {
        dedup_phenomena(explicit)
    } else {
        dedup_phenomena(configured)
    }
}

pub fn build(
    gold: &GoldStandard,
    phenomena: &PhenomenonMap,
    sources: &[LanguageSource],
    requested: Vec<String>,
) -> PhenomenaReport {
    let rows = breakdown(gold, phenomena, &loaded_submissions(sources), &requested);
    PhenomenaReport {
        phenomena: requested,
        languages: breakdown_languages(&rows),
        unavailable: unavailable_sources(sources),
    }
}

pub(super) fn log_summary(report: &PhenomenaReport) {
    info!(
        phenomena = report.phenomena.len(),
        languages = report.languages.len(),
        skipped = report.unavailable.len(),
        "phenomenon breakdown completed"
    );
}
