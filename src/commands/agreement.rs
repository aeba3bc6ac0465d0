use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::ReportArgs;
use crate::metrics::{
    AgreementReport, LanguageSource, UnavailableSource, aggregate, loaded_submissions,
    unavailable_sources,
};

use super::sources::SourceContext;
use super::{AGREEMENT_REPORT, render, report_stamp, write_report};

#[derive(Debug, Clone, Serialize)]
pub struct AgreementDocument {
    #[serde(flatten)]
    pub report: AgreementReport,
    pub unavailable: Vec<UnavailableSource>,
}

pub fn run(args: ReportArgs) -> Result<()> {
    let context = SourceContext::prepare(&args.sources)?;
    let loaded = context.load_languages();

    let document = build(&loaded.sources);
    let stamp = report_stamp(&args);
    let markdown = render::agreement_markdown(
        &context,
        &document.report,
        &document.unavailable,
        stamp.as_deref(),
    )?;

    write_report(
        &context.reports_dir(args.reports_dir.as_deref()),
        AGREEMENT_REPORT,
        &markdown,
        args.json.then_some(&document),
    )?;
    log_summary(&document);

    Ok(())
}

pub fn build(sources: &[LanguageSource]) -> AgreementDocument {
    AgreementDocument {
        report: aggregate(&loaded_submissions(sources)),
        unavailable: unavailable_sources(sources),
    }
}

pub(super) fn log_summary(document: &AgreementDocument) {
    let summary = &document.report.summary;
    info!(
        languages = summary.languages.len(),
        skipped = document.unavailable.len(),
        items = summary.item_count,
        ratings = summary.rating_count,
        excluded = summary.excluded_rating_count,
        fleiss_kappa = ?summary.fleiss_kappa,
        "agreement completed"
    );
}
