pub mod config;
pub use config::{ApiConfig, ClassifyConfig, Config, DisplayConfig, ExportConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AalLensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("class count must be at least 1, got {0}")]
    InvalidClassCount(usize),
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
    #[error("invalid metric key: {0}")]
    InvalidMetric(String),
    #[error("HTTP {status} for {path}")]
    Http { status: u16, path: String },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AalLensError>;
