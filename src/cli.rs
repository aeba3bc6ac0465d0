use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "nli-agreement",
    version,
    about = "Gold-standard evaluation, inter-annotator agreement and phenomenon reports for multilingual NLI annotations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score each language against the gold standard.
    Evaluate(ReportArgs),
    /// Pool all languages and measure agreement per item.
    Agreement(ReportArgs),
    /// Accuracy per language and linguistic phenomenon.
    Phenomena(PhenomenaArgs),
    /// Annotated items against the base dataset size.
    Progress(ReportArgs),
    /// Write every report plus a run manifest.
    Report(PhenomenaArgs),
    /// Hash and list every input file.
    Inventory(InventoryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[arg(long, default_value = ".")]
    pub data_root: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Restrict the run to these language codes.
    #[arg(long = "lang")]
    pub languages: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[arg(long)]
    pub reports_dir: Option<PathBuf>,

    /// Also write the structured result next to the Markdown report.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Add an "Updated" line to the Markdown header.
    #[arg(long, default_value_t = false)]
    pub timestamp: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PhenomenaArgs {
    #[command(flatten)]
    pub report: ReportArgs,

    #[arg(long = "phenomenon")]
    pub phenomena: Vec<String>,

    /// Report every phenomenon tag present in the gold items.
    #[arg(long, default_value_t = false, conflicts_with = "phenomena")]
    pub all_phenomena: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
