use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::cli::PhenomenaArgs;
use crate::metrics::evaluate_languages;
use crate::util::{utc_compact_string, utc_string, write_json_pretty};

use super::sources::{SourceContext, SourceRecord};
use super::{
    AGREEMENT_REPORT, EVALUATION_REPORT, PHENOMENA_REPORT, PROGRESS_REPORT, agreement, evaluate,
    phenomena, progress, render, write_report,
};

pub const RUN_MANIFEST: &str = "run_manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub data_root: String,
    pub languages: Vec<String>,
    pub phenomena: Vec<String>,
    pub reports: Vec<String>,
    pub overall_accuracy: Option<f64>,
    pub fleiss_kappa: Option<f64>,
    pub sources: Vec<SourceRecord>,
}

/// Loads every source once and writes all four reports plus the manifest.
pub fn run(args: PhenomenaArgs) -> Result<()> {
    let report_args = &args.report;
    let context = SourceContext::prepare(&report_args.sources)?;
    let reports_dir = context.reports_dir(report_args.reports_dir.as_deref());

    let (gold, gold_record) = context.load_gold()?;
    let (phenomenon_map, phenomena_record) = context.load_phenomena()?;
    let loaded = context.load_languages();
    let bases = context.load_bases();

    let now = Utc::now();
    let generated_at = utc_string(now);
    let stamp = report_args.timestamp.then_some(generated_at.as_str());
    let mut written = Vec::new();

    let evaluation = evaluate_languages(&gold, &loaded.sources);
    written.extend(write_report(
        &reports_dir,
        EVALUATION_REPORT,
        &render::evaluation_markdown(&context, &evaluation, gold.len(), stamp)?,
        report_args.json.then_some(&evaluation),
    )?);
    evaluate::log_summary(&evaluation);

    let pooled = agreement::build(&loaded.sources);
    written.extend(write_report(
        &reports_dir,
        AGREEMENT_REPORT,
        &render::agreement_markdown(&context, &pooled.report, &pooled.unavailable, stamp)?,
        report_args.json.then_some(&pooled),
    )?);
    agreement::log_summary(&pooled);

    let requested = phenomena::requested_phenomena(
        &context.config.phenomena,
        &args.phenomena,
        args.all_phenomena,
        &gold,
        &phenomenon_map,
    );
    let breakdown = phenomena::build(&gold, &phenomenon_map, &loaded.sources, requested);
    written.extend(write_report(
        &reports_dir,
        PHENOMENA_REPORT,
        &render::phenomena_markdown(&context, &breakdown, stamp)?,
        report_args.json.then_some(&breakdown),
    )?);
    phenomena::log_summary(&breakdown);

    let tracked = progress::build(&loaded.sources, &bases);
    written.extend(write_report(
        &reports_dir,
        PROGRESS_REPORT,
        &render::progress_markdown(&context, &tracked, stamp)?,
        report_args.json.then_some(&tracked),
    )?);
    progress::log_summary(&tracked);

    let mut sources = vec![gold_record, phenomena_record];
    sources.extend(loaded.records);
    sources.extend(bases.into_iter().map(|base| base.record));

    let manifest = RunManifest {
        manifest_version: 1,
        run_id: format!("run-{}", utc_compact_string(now)),
        generated_at,
        data_root: context.data_root.display().to_string(),
        languages: context.languages.clone(),
        phenomena: breakdown.phenomena.clone(),
        reports: written
            .iter()
            .map(|path| path.display().to_string())
            .collect(),
        overall_accuracy: evaluation.overall_accuracy,
        fleiss_kappa: pooled.report.summary.fleiss_kappa,
        sources,
    };

    let manifest_path = reports_dir.join(RUN_MANIFEST);
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote run manifest");
    info!(
        run_id = %manifest.run_id,
        reports = manifest.reports.len(),
        sources = manifest.sources.len(),
        "report run completed"
    );

    Ok(())
}
