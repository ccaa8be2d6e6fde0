use thiserror::Error;

use crate::model::GenerationReport;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid range for {what}: [{min}, {max}]")]
    InvalidRange { what: String, min: i64, max: i64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("store error: {0}")]
    Store(#[from] fauxtree_core::Error),
    #[error("asset error: {0}")]
    Asset(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("media scan error: {0}")]
    MediaScan(#[from] walkdir::Error),
    #[error("generation failed")]
    Failed(Box<GenerationReport>),
}

impl GenerationError {
    pub(crate) fn range(what: impl Into<String>, min: i64, max: i64) -> Self {
        Self::InvalidRange {
            what: what.into(),
            min,
            max,
        }
    }
}

/// A pool had nothing matching the request. Callers skip the attachment.
#[derive(Debug, Clone, Error)]
#[error("{pool} pool has no {wanted} left")]
pub struct PoolExhausted {
    pub pool: &'static str,
    pub wanted: String,
}
