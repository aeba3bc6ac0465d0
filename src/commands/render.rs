use std::fmt::{self, Write as _};

use anyhow::Result;

use crate::metrics::{
    AgreementReport, EvaluationOutcome, GoldEvaluationReport, MetricsResult, PhenomenonBreakdown,
    UnavailableSource,
};
use crate::model::{Label, SUBSTANTIVE_LABELS};
use crate::stats::{Association, ChiSquareResult, interpret_kappa};

use super::phenomena::PhenomenaReport;
use super::progress::{ProgressOutcome, ProgressReport};
use super::sources::SourceContext;

const NO_DATA: &str = "-";

pub fn evaluation_markdown(
    context: &SourceContext,
    report: &GoldEvaluationReport,
    gold_items: usize,
    generated_at: Option<&str>,
) -> Result<String> {
    let mut out = String::new();
    write_header(&mut out, "Gold Standard Evaluation", generated_at)?;
    writeln!(out, "Gold standard items: {gold_items}\n")?;

    out.push_str("## Per-language metrics\n\n");
    out.push_str("| Language | Records | Matched | Excluded | Excluded rate | Accuracy |");
    for label in SUBSTANTIVE_LABELS {
        write!(out, " {label} P / R / F1 |")?;
    }
    out.push('\n');
    out.push_str("|---|---:|---:|---:|---:|---:|---|---|---|\n");

    for entry in &report.languages {
        let language = context.language_label(&entry.language);
        match &entry.outcome {
            EvaluationOutcome::Evaluated { metrics } => {
                write!(
                    out,
                    "| {language} | {} | {} | {} | {} | {} |",
                    metrics.total_records,
                    metrics.matched_count,
                    metrics.excluded_count,
                    percent(metrics.excluded_rate),
                    percent(metrics.accuracy),
                )?;
                for label in SUBSTANTIVE_LABELS {
                    write!(out, " {} |", label_scores(metrics, label))?;
                }
                out.push('\n');
            }
            EvaluationOutcome::Missing => {
                write_unavailable_row(&mut out, &language, "missing", 7)?;
            }
            EvaluationOutcome::Invalid { reason } => {
                write_unavailable_row(&mut out, &language, &format!("invalid: {reason}"), 7)?;
            }
        }
    }
    out.push('\n');

    match report.overall_accuracy {
        Some(accuracy) => writeln!(
            out,
            "**Overall accuracy (weighted by matched records):** {} over {} matched records",
            percent(accuracy),
            report.overall_matched_count
        )?,
        None => out.push_str("**Overall accuracy (weighted by matched records):** no data\n"),
    }
    out.push('\n');

    out.push_str("## Gold x predicted association\n\n");
    out.push_str("| Language | Chi-square | df | p-value | Cramér's V | Significance |\n");
    out.push_str("|---|---:|---:|---:|---:|---|\n");
    for entry in &report.languages {
        let Some(metrics) = entry.metrics() else {
            continue;
        };
        writeln!(
            out,
            "| {} | {} |",
            context.language_label(&entry.language),
            association_cells(&metrics.association)
        )?;
    }

    Ok(out)
}

pub fn agreement_markdown(
    context: &SourceContext,
    report: &AgreementReport,
    unavailable: &[UnavailableSource],
    generated_at: Option<&str>,
) -> Result<String> {
    let summary = &report.summary;
    let mut out = String::new();
    write_header(&mut out, "Inter-Annotator Agreement", generated_at)?;

    let pooled = if summary.languages.is_empty() {
        "none".to_string()
    } else {
        summary.languages.join(", ")
    };
    writeln!(out, "Languages pooled: {pooled}")?;
    write_unavailable_line(&mut out, context, unavailable)?;
    out.push('\n');

    out.push_str("## Summary\n\n");
    out.push_str("| Metric | Value |\n|---|---|\n");
    writeln!(out, "| Items rated | {} |", summary.item_count)?;
    writeln!(
        out,
        "| Items with two or more raters | {} |",
        summary.kappa_item_count
    )?;
    writeln!(out, "| Substantive ratings | {} |", summary.rating_count)?;
    writeln!(out, "| Excluded ratings | {} |", summary.excluded_rating_count)?;
    writeln!(
        out,
        "| Average agreement | {} |",
        percent_value(summary.average_agreement_pct)
    )?;
    let kappa = match summary.fleiss_kappa {
        Some(kappa) => format!("{kappa:.3} ({})", interpret_kappa(Some(kappa))),
        None => interpret_kappa(None).to_string(),
    };
    writeln!(out, "| Fleiss' kappa | {kappa} |")?;
    for label in SUBSTANTIVE_LABELS {
        writeln!(
            out,
            "| {label} ratings | {} |",
            summary.label_totals.get(label)
        )?;
    }
    writeln!(
        out,
        "| Label distribution | {} |",
        chi_square_sentence(&summary.chi_square)
    )?;
    out.push('\n');

    out.push_str("## Per-item agreement\n\n");
    out.push_str(
        "| ID | Entailment | Contradiction | Neutral | Excluded | Raters | Dominant | Agreement |\n",
    );
    out.push_str("|---|---:|---:|---:|---:|---:|---|---:|\n");
    for item in &report.per_item {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            escape_cell(item.item_id.as_str()),
            item.label_counts.entailment,
            item.label_counts.contradiction,
            item.label_counts.neutral,
            item.excluded_count,
            item.rater_count,
            item.dominant_label,
            percent_value(item.agreement_pct),
        )?;
    }

    Ok(out)
}

pub fn phenomena_markdown(
    context: &SourceContext,
    report: &PhenomenaReport,
    generated_at: Option<&str>,
) -> Result<String> {
    let mut out = String::new();
    write_header(&mut out, "Phenomenon Report", generated_at)?;
    let phenomena = if report.phenomena.is_empty() {
        "none".to_string()
    } else {
        report.phenomena.join(", ")
    };
    writeln!(out, "Phenomena: {phenomena}\n")?;

    for code in &context.languages {
        writeln!(out, "## {}\n", context.language_label(code))?;

        if let Some(source) = report.unavailable.iter().find(|source| &source.language == code) {
            writeln!(out, "No data ({}).\n", escape_cell(&source.reason))?;
            continue;
        }
        let Some(breakdown) = report.languages.iter().find(|entry| &entry.language == code) else {
            out.push_str("No data.\n\n");
            continue;
        };
        write_breakdown_section(&mut out, breakdown)?;
    }

    Ok(out)
}

fn write_breakdown_section(out: &mut String, breakdown: &PhenomenonBreakdown) -> fmt::Result {
    out.push_str(
        "| Phenomenon | Samples | Correct | Accuracy | Entailment | Contradiction | Neutral |\n",
    );
    out.push_str("|---|---:|---:|---:|---:|---:|---:|\n");
    for row in &breakdown.rows {
        let accuracy = if row.sample_count == 0 {
            NO_DATA.to_string()
        } else {
            percent(row.accuracy)
        };
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} |",
            escape_cell(&row.phenomenon),
            row.sample_count,
            row.matched_count,
            accuracy,
            row.label_counts.entailment,
            row.label_counts.contradiction,
            row.label_counts.neutral,
        )?;
    }
    out.push('\n');

    match breakdown.average_accuracy {
        Some(accuracy) => writeln!(out, "Average accuracy: {}", percent(accuracy))?,
        None => out.push_str("Average accuracy: no data\n"),
    }
    match &breakdown.effect {
        Some(effect) => writeln!(
            out,
            "Phenomenon effect: {}, Cramér's V = {:.3}",
            chi_square_sentence(&effect.chi_square),
            effect.cramers_v
        )?,
        None => out.push_str("Phenomenon effect: fewer than two sampled phenomena\n"),
    }
    out.push('\n');
    Ok(())
}

pub fn progress_markdown(
    context: &SourceContext,
    report: &ProgressReport,
    generated_at: Option<&str>,
) -> Result<String> {
    let mut out = String::new();
    write_header(&mut out, "Annotation Progress", generated_at)?;
    out.push_str("| Language | Annotated | Total | Progress |\n");
    out.push_str("|---|---:|---:|---:|\n");

    for entry in &report.languages {
        let language = context.language_label(&entry.language);
        match &entry.outcome {
            ProgressOutcome::Tracked { row } => writeln!(
                out,
                "| {language} | {} | {} | {} |",
                row.annotated,
                row.total,
                percent_value(row.progress_pct)
            )?,
            ProgressOutcome::Unavailable { reason } => {
                write_unavailable_row(&mut out, &language, reason, 2)?;
            }
        }
    }

    Ok(out)
}

fn write_header(out: &mut String, title: &str, generated_at: Option<&str>) -> fmt::Result {
    writeln!(out, "# {title}\n")?;
    if let Some(generated_at) = generated_at {
        writeln!(out, "Updated: {generated_at}\n")?;
    }
    Ok(())
}

fn write_unavailable_line(
    out: &mut String,
    context: &SourceContext,
    unavailable: &[UnavailableSource],
) -> fmt::Result {
    if unavailable.is_empty() {
        return Ok(());
    }
    let listed = unavailable
        .iter()
        .map(|source| {
            format!(
                "{} ({})",
                context.language_label(&source.language),
                escape_cell(&source.reason)
            )
        })
        .collect::<Vec<String>>()
        .join(", ");
    writeln!(out, "Languages without data: {listed}")
}

/// A row whose first data cell carries `status` and the rest are blank.
fn write_unavailable_row(
    out: &mut String,
    language: &str,
    status: &str,
    remaining: usize,
) -> fmt::Result {
    write!(out, "| {language} | {} |", escape_cell(status))?;
    for _ in 0..remaining {
        write!(out, " {NO_DATA} |")?;
    }
    out.push('\n');
    Ok(())
}

fn label_scores(metrics: &MetricsResult, label: Label) -> String {
    match metrics.per_label.get(&label) {
        Some(scores) => format!(
            "{:.3} / {:.3} / {:.3}",
            scores.precision, scores.recall, scores.f1
        ),
        None => NO_DATA.to_string(),
    }
}

fn association_cells(association: &Association) -> String {
    let chi_square = &association.chi_square;
    format!(
        "{:.3} | {} | {} | {:.3} | {}",
        chi_square.statistic,
        chi_square.degrees_of_freedom,
        p_value(chi_square.p_value),
        association.cramers_v,
        chi_square.significance()
    )
}

fn chi_square_sentence(result: &ChiSquareResult) -> String {
    format!(
        "chi-square = {:.3} (df = {}), p = {}, {}",
        result.statistic,
        result.degrees_of_freedom,
        p_value(result.p_value),
        result.significance()
    )
}

fn percent(rate: f64) -> String {
    percent_value(rate * 100.0)
}

fn percent_value(value: f64) -> String {
    format!("{value:.2}%")
}

fn p_value(p: f64) -> String {
    if p < 0.0001 {
        "< 0.0001".to_string()
    } else {
        format!("{p:.4}")
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}
