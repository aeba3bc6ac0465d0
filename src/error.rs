use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    #[error("{source_name}: required column `{column}` not found in header")]
    Schema { source_name: String, column: String },

    #[error("no annotation source for language {language}")]
    SourceMissing { language: String },

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("gold standard row {row}: `{value}` is not Entailment, Contradiction or Neutral")]
    InvalidGoldLabel { row: usize, value: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn schema(source_name: impl Into<String>, column: impl Into<String>) -> Self {
        EngineError::Schema {
            source_name: source_name.into(),
            column: column.into(),
        }
    }

    pub fn source_missing(language: impl Into<String>) -> Self {
        EngineError::SourceMissing {
            language: language.into(),
        }
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        EngineError::EmptyInput(msg.into())
    }
}
