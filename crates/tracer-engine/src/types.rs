//! Request and response types for case engine operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tracer_core::{CaseId, ElementType, InfoMap, MovementType, NetworkElement};

/// Derived classification of a path. Never stored; recomputed on request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub direct_traversals: usize,
    pub lateral_movements: usize,
    pub pivot_points: usize,
    /// Elements flagged as pivots, in path order.
    pub pivots: Vec<PivotPoint>,
    /// Every lateral element, with the technique inferred from its entries.
    pub lateral_hops: Vec<LateralHop>,
}

/// An element flagged as a pivot. Identified by position since names need
/// not be unique within a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub position: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateralHop {
    pub position: usize,
    pub name: String,
    pub technique: Option<String>,
}

/// Structured report of a case, as served over the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub case_id: CaseId,
    pub threat_type: String,
    pub created_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub element_count: usize,
    pub source_ip: String,
    pub destination_ip: String,
    pub network_elements: Vec<NetworkElement>,
    pub summary: AnalysisSummary,
}

/// A report in both structured and rendered form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub report: CaseReport,
    pub text: String,
}

/// One line of a case listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseListing {
    pub case_id: CaseId,
    pub threat_type: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub element_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A rendered export, ready to be written to disk by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseExport {
    pub file_name: String,
    pub contents: String,
    pub content_hash: String,
}

/// An element as supplied by a front-end, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRequest {
    pub element_type: ElementType,
    pub name: String,
    #[serde(default)]
    pub movement_type: MovementType,
    #[serde(default)]
    pub source_info: Option<InfoMap>,
    #[serde(default)]
    pub destination_info: Option<InfoMap>,
}

impl ElementRequest {
    /// Validate into a [`NetworkElement`].
    pub fn into_element(self) -> tracer_core::error::Result<NetworkElement> {
        let mut element = NetworkElement::new(self.element_type, self.name, self.movement_type)?;
        element.source_info = self.source_info.unwrap_or_default();
        element.destination_info = self.destination_info.unwrap_or_default();
        Ok(element)
    }
}
