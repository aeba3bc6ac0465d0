use anyhow::Result;
use tracing::info;

use crate::cli::ReportArgs;
use crate::metrics::{GoldEvaluationReport, evaluate_languages};

use super::sources::SourceContext;
use super::{EVALUATION_REPORT, render, report_stamp, write_report};

pub fn run(args: ReportArgs) -> Result<()> {
    let context = SourceContext::prepare(&args.sources)?;
    let (gold, _) = context.load_gold()?;
    let loaded = context.load_languages();

    let report = evaluate_languages(&gold, &loaded.sources);
    let stamp = report_stamp(&args);
    let markdown = render::evaluation_markdown(&context, &report, gold.len(), stamp.as_deref())?;

    write_report(
        &context.reports_dir(args.reports_dir.as_deref()),
        EVALUATION_REPORT,
        &markdown,
        args.json.then_some(&report),
    )?;
    log_summary(&report);

    Ok(())
}

pub(super) fn log_summary(report: &GoldEvaluationReport) {
    let evaluated = report
        .languages
        .iter()
        .filter(|entry| entry.metrics().is_some())
        .count();
    info!(
        languages = report.languages.len(),
        evaluated,
        matched = report.overall_matched_count,
        overall_accuracy = ?report.overall_accuracy,
        "evaluation completed"
    );
}
