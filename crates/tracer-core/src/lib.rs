//! tracer-core: Case data model and network path model for TRACER.
//!
//! This crate provides the foundational types shared by every TRACER component:
//! - The case aggregate and its network elements
//! - The ordered path model with insertion-by-gap semantics
//! - Activity events recorded against a case
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod path;
pub mod types;

pub use error::CoreError;
pub use events::{CaseEvent, EventPayload};
pub use path::{InsertionPoint, NetworkPath};
pub use types::{Case, CaseId, ElementType, InfoMap, InfoSide, MovementType, NetworkElement};
