//! Error types for the tracer-engine crate.

use thiserror::Error;

use tracer_core::{CaseId, CoreError};
use tracer_store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Case not found: {0}")]
    CaseNotFound(CaseId),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CaseNotFound(id) => Self::CaseNotFound(id),
            other => Self::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
