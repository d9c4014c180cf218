use std::io;

use thiserror::Error;

/// Failures that terminate a stage invocation.
///
/// `stage` names the stage, or `generate`, whose precondition failed.
/// Malformed rows are not represented here: they are dropped and counted by
/// the transform that meets them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage}: input object '{key}' not present in the bucket")]
    MissingInput { stage: String, key: String },
    #[error("{stage}: output object '{key}' already present in the bucket")]
    OutputAlreadyExists { stage: String, key: String },
    #[error("object store unavailable: {0}")]
    StoreUnavailable(#[from] object_store::Error),
    #[error("total quantity for '{name}' exceeds the 64-bit range")]
    NumericOverflow { name: String },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
