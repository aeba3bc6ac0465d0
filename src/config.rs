use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "NLI_AGREEMENT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "nli-agreement.json";

const DEFAULT_LANGUAGES: [(&str, &str); 10] = [
    ("AR", "Arabic"),
    ("CN", "Cantonese"),
    ("DE", "German"),
    ("ES", "Spanish"),
    ("HI", "Hindi"),
    ("PT", "Portuguese"),
    ("TH", "Thai"),
    ("TR", "Turkish"),
    ("UR", "Urdu"),
    ("ZH", "Chinese"),
];

const DEFAULT_PHENOMENA: [&str; 4] = [
    "conditionality",
    "modality",
    "comparatives|quantifier_scope",
    "intensionality",
];

/// Project layout and defaults. Relative paths resolve against the data root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub languages: BTreeMap<String, String>,
    pub phenomena: Vec<String>,
    pub annotations_dir: PathBuf,
    pub gold_path: PathBuf,
    pub phenomena_path: PathBuf,
    pub base_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub discover_languages: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
            phenomena: DEFAULT_PHENOMENA.iter().map(|name| name.to_string()).collect(),
            annotations_dir: PathBuf::from("Annotations"),
            gold_path: PathBuf::from("GoldStandard/gold_standard.csv"),
            phenomena_path: PathBuf::from("GoldStandard/Phenomena.csv"),
            base_dir: PathBuf::from("datasets/NLI"),
            reports_dir: PathBuf::from("Reports"),
            discover_languages: true,
        }
    }
}

impl ProjectConfig {
    pub fn language_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.languages
            .get(code)
            .map(String::as_str)
            .unwrap_or(code)
    }

    pub fn annotations_dir(&self, data_root: &Path) -> PathBuf {
        data_root.join(&self.annotations_dir)
    }

    pub fn annotation_path(&self, data_root: &Path, code: &str) -> PathBuf {
        self.annotations_dir(data_root)
            .join(format!("annotations_{code}.csv"))
    }

    pub fn base_path(&self, data_root: &Path, code: &str) -> PathBuf {
        data_root.join(&self.base_dir).join(format!("NLI_{code}.csv"))
    }

    pub fn gold_path(&self, data_root: &Path) -> PathBuf {
        data_root.join(&self.gold_path)
    }

    pub fn phenomena_path(&self, data_root: &Path) -> PathBuf {
        data_root.join(&self.phenomena_path)
    }

    pub fn reports_dir(&self, data_root: &Path) -> PathBuf {
        data_root.join(&self.reports_dir)
    }
}

pub fn load_config(data_root: &Path, explicit: Option<&Path>) -> Result<ProjectConfig> {
    let env_value = std::env::var(CONFIG_PATH_ENV).ok();
    let Some(path) = resolve_config_path(data_root, explicit, env_value.as_deref()) else {
        debug!(data_root = %data_root.display(), "no config file; using defaults");
        return Ok(ProjectConfig::default());
    };

    let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: ProjectConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    info!(
        path = %path.display(),
        languages = config.languages.len(),
        phenomena = config.phenomena.len(),
        "loaded project config"
    );
    Ok(config)
}

/// Explicit flag, then the environment, then `<data_root>/nli-agreement.json`
/// if it exists. The first two are returned even when the file is absent so
/// that a mistyped path fails loudly.
pub fn resolve_config_path(
    data_root: &Path,
    explicit: Option<&Path>,
    env_value: Option<&str>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value.map(str::trim).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(value));
    }
    let fallback = data_root.join(DEFAULT_CONFIG_FILE);
    fallback.is_file().then_some(fallback)
}
