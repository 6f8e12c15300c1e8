//! tracer-store: Case repository for TRACER.
//!
//! Persists case documents and their activity logs. Two variants satisfy the
//! same [`CaseRepository`] contract: a file-backed store and a Neo4j document
//! store. [`FallbackRepository`] wraps them so a graph store outage degrades
//! the process to file storage instead of failing case operations.

pub mod client;
pub mod fallback;
pub mod file;
pub mod graph;
pub mod mutations;
pub mod queries;
pub mod repository;

pub use client::{GraphClient, GraphError};
pub use fallback::{open_repository, DefaultRepository, FallbackRepository};
pub use file::FileRepository;
pub use graph::GraphRepository;
pub use repository::{CaseRepository, StorageBackend, StoreError};
