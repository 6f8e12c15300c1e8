//! Activity events recorded against a case.
//!
//! Every mutation, report and export appends one event to the case's
//! activity log, giving an ordered record of how the path was built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CaseId, ElementType, InfoSide, MovementType};

/// Unique identifier for an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// An entry in a case's activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseEvent {
    pub event_id: EventId,
    pub case_id: CaseId,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl CaseEvent {
    pub fn new(case_id: CaseId, payload: EventPayload) -> Self {
        Self::at(case_id, payload, Utc::now())
    }

    pub fn at(case_id: CaseId, payload: EventPayload, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            case_id,
            timestamp,
            payload,
        }
    }

    /// Short action name, as written to logs.
    pub fn action(&self) -> &'static str {
        match self.payload {
            EventPayload::CaseCreated { .. } => "case_created",
            EventPayload::ElementInserted { .. } => "element_inserted",
            EventPayload::EntryAdded { .. } => "entry_added",
            EventPayload::ElementRemoved { .. } => "element_removed",
            EventPayload::ReportGenerated { .. } => "report_generated",
            EventPayload::CaseExported { .. } => "case_exported",
        }
    }
}

/// The event payload, tagged by type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventPayload {
    /// The initial detection was recorded.
    CaseCreated {
        threat_type: String,
        source_ip: String,
        destination_ip: String,
    },
    /// A network element was inserted at a position.
    ElementInserted {
        position: usize,
        name: String,
        element_type: ElementType,
        movement_type: MovementType,
    },
    /// An information entry was appended to an element.
    EntryAdded {
        position: usize,
        name: String,
        side: InfoSide,
        key: String,
        value: String,
    },
    /// An element was removed from the path.
    ElementRemoved { position: usize, name: String },
    /// A report was rendered from a fresh classification.
    ReportGenerated {
        element_count: usize,
        direct_traversals: usize,
        lateral_movements: usize,
        pivot_points: usize,
    },
    /// A shareable export was produced.
    CaseExported { content_hash: String },
}
