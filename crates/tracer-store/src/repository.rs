//! Repository trait shared by every storage variant.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tracer_core::{Case, CaseEvent, CaseId};

use crate::client::GraphError;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Case not found: {0}")]
    CaseNotFound(CaseId),

    #[error("Case already exists: {0}")]
    AlreadyExists(CaseId),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the error reflects a failing backend rather than the request.
    /// Operational failures of the graph store trigger the file fallback.
    pub fn is_operational(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Io(_) => true,
            Self::Graph(GraphError::Serialization(_)) => false,
            Self::Graph(_) => true,
            Self::CaseNotFound(_) | Self::AlreadyExists(_) | Self::Serialization(_) => false,
        }
    }
}

/// Which variant served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Graph,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Graph => f.write_str("graph"),
        }
    }
}

/// Trait for case persistence backends.
///
/// `save` replaces the whole document; readers never observe a partially
/// written case. Every variant stores the same logical document shape.
pub trait CaseRepository: Send + Sync {
    /// Store the complete case document, overwriting any previous version.
    fn save(&self, case: &Case) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Store a new case document only if no case with its id exists.
    ///
    /// The check and the write are one atomic step; a taken id fails with
    /// [`StoreError::AlreadyExists`] and leaves the stored case untouched.
    fn create(&self, case: &Case) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Retrieve a case. Fails with [`StoreError::CaseNotFound`] if absent.
    fn load(&self, case_id: &CaseId) -> impl Future<Output = Result<Case, StoreError>> + Send;

    /// Identifiers of all stored cases, oldest first.
    fn list(&self) -> impl Future<Output = Result<Vec<CaseId>, StoreError>> + Send;

    fn exists(&self, case_id: &CaseId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Append an entry to the case's activity log.
    fn append_event(
        &self,
        event: &CaseEvent,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// The case's activity log in the order it was written.
    fn events(
        &self,
        case_id: &CaseId,
    ) -> impl Future<Output = Result<Vec<CaseEvent>, StoreError>> + Send;

    /// The variant currently serving calls.
    fn backend(&self) -> StorageBackend;
}
