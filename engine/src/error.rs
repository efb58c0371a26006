use thiserror::Error;

use crate::config::ContextFormat;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse {format} attack context: {message}")]
    Config {
        format: ContextFormat,
        message: String,
    },
    #[error("invalid evaluation options: {0}")]
    InvalidOptions(String),
    #[error("exact enumeration exceeded {limit} paths; use sampling instead")]
    EnumerationLimit { limit: u64 },
    #[error("evaluation cancelled")]
    Cancelled,
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
