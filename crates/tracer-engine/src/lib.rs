//! tracer-engine: Case engine for TRACER.
//!
//! Owns the lifecycle of a case: creation, incremental mutation of its
//! network path, classification, reporting and export. Every operation
//! loads the case from the repository, mutates it, and saves it back before
//! reporting success, so the stored document is the only copy of a case.
//! Each successful mutation also appends an event to the case's activity log.

pub mod classify;
pub mod error;
pub mod export;
pub mod prompt;
pub mod report;
pub mod types;

pub use error::EngineError;
pub use types::{
    AnalysisSummary, CaseExport, CaseListing, CaseReport, ElementRequest, GeneratedReport,
    LateralHop, PivotPoint,
};

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tracer_core::config::PivotRule;
use tracer_core::{
    Case, CaseEvent, CaseId, EventPayload, InfoSide, InsertionPoint, NetworkElement, NetworkPath,
};
use tracer_store::{CaseRepository, StoreError};

use crate::error::Result;

/// Source of "now" for case ids, event timestamps and report headers.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The case orchestrator.
pub struct CaseEngine<R> {
    repo: R,
    pivot_rule: PivotRule,
    clock: Clock,
}

impl<R: CaseRepository> CaseEngine<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            pivot_rule: PivotRule::default(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Set the rule used to flag pivot points.
    pub fn with_pivot_rule(mut self, rule: PivotRule) -> Self {
        self.pivot_rule = rule;
        self
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn pivot_rule(&self) -> PivotRule {
        self.pivot_rule
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open a new case for an initial detection.
    ///
    /// The id is derived from the creation second; if that id is taken the
    /// first free `_2`, `_3`, ... suffix is used. Each candidate is claimed
    /// atomically by the repository, so concurrent creators get distinct ids.
    pub async fn new_case(
        &self,
        threat_type: &str,
        source: &str,
        destination: &str,
    ) -> Result<Case> {
        self.new_case_with_elements(threat_type, source, destination, Vec::new())
            .await
    }

    /// Open a new case whose path already holds `elements`, in order.
    ///
    /// Every element is validated before anything is stored, so an invalid
    /// element means no case is created.
    pub async fn new_case_with_elements(
        &self,
        threat_type: &str,
        source: &str,
        destination: &str,
        elements: Vec<NetworkElement>,
    ) -> Result<Case> {
        let mut path = NetworkPath::new(source, destination)?;
        for element in elements {
            element.validate()?;
            path.push(element);
        }
        let created_at = self.now();

        let base = CaseId::from_timestamp(created_at);
        let mut case = Case::new(base.clone(), threat_type.trim(), path, created_at);
        let mut suffix = 2;
        loop {
            match self.repo.create(&case).await {
                Ok(()) => break,
                Err(StoreError::AlreadyExists(_)) => {
                    case.case_id = base.with_suffix(suffix);
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            case_id = %case.case_id,
            threat_type = %case.threat_type,
            source = %case.path.source(),
            destination = %case.path.destination(),
            elements = case.element_count(),
            "Case created"
        );

        self.record(
            &case.case_id,
            EventPayload::CaseCreated {
                threat_type: case.threat_type.clone(),
                source_ip: case.path.source().to_string(),
                destination_ip: case.path.destination().to_string(),
            },
        )
        .await;

        for (position, element) in case.path.sequence() {
            self.record(
                &case.case_id,
                EventPayload::ElementInserted {
                    position,
                    name: element.name.clone(),
                    element_type: element.element_type.clone(),
                    movement_type: element.movement_type,
                },
            )
            .await;
        }

        Ok(case)
    }

    pub async fn retrieve(&self, case_id: &CaseId) -> Result<Case> {
        Ok(self.repo.load(case_id).await?)
    }

    /// Rewrite the stored document of a case as a checkpoint.
    ///
    /// Mutations are already saved eagerly; this only refreshes the stored
    /// copy, e.g. to migrate a document written by an older version.
    pub async fn persist(&self, case_id: &CaseId) -> Result<()> {
        let case = self.repo.load(case_id).await?;
        self.repo.save(&case).await?;
        tracing::debug!(case_id = %case_id, "Case persisted");
        Ok(())
    }

    /// Summaries of every stored case, oldest first.
    ///
    /// A document that cannot be read is skipped with a warning rather than
    /// hiding every other case.
    pub async fn list_cases(&self) -> Result<Vec<CaseListing>> {
        let ids = self.repo.list().await?;
        let mut listings = Vec::with_capacity(ids.len());

        for case_id in ids {
            match self.repo.load(&case_id).await {
                Ok(case) => listings.push(CaseListing {
                    element_count: case.element_count(),
                    source_ip: case.path.source().to_string(),
                    destination_ip: case.path.destination().to_string(),
                    case_id: case.case_id,
                    threat_type: case.threat_type,
                    created_at: case.created_at,
                }),
                Err(e) => {
                    tracing::warn!(case_id = %case_id, error = %e, "Skipping unreadable case");
                }
            }
        }

        Ok(listings)
    }

    /// The case's activity log, oldest first.
    pub async fn history(&self, case_id: &CaseId) -> Result<Vec<CaseEvent>> {
        if !self.repo.exists(case_id).await? {
            return Err(EngineError::CaseNotFound(case_id.clone()));
        }
        Ok(self.repo.events(case_id).await?)
    }

    // ── Path Mutation ────────────────────────────────────────────

    /// The `N + 1` gaps where an element can currently be inserted.
    pub async fn insertion_points(&self, case_id: &CaseId) -> Result<Vec<InsertionPoint>> {
        let case = self.repo.load(case_id).await?;
        Ok(case.path.insertion_points())
    }

    /// Insert an element immediately before `position`.
    pub async fn add_element(
        &self,
        case_id: &CaseId,
        position: usize,
        element: NetworkElement,
    ) -> Result<Case> {
        self.insert_element(case_id, Some(position), element).await
    }

    /// Insert an element just before the destination.
    pub async fn append_element(&self, case_id: &CaseId, element: NetworkElement) -> Result<Case> {
        self.insert_element(case_id, None, element).await
    }

    async fn insert_element(
        &self,
        case_id: &CaseId,
        position: Option<usize>,
        element: NetworkElement,
    ) -> Result<Case> {
        element.validate()?;

        let mut case = self.repo.load(case_id).await?;
        let position = position.unwrap_or(case.path.len() + 1);

        let payload = EventPayload::ElementInserted {
            position,
            name: element.name.clone(),
            element_type: element.element_type.clone(),
            movement_type: element.movement_type,
        };

        case.path.insert(position, element)?;
        self.repo.save(&case).await?;

        tracing::info!(
            case_id = %case_id,
            position,
            elements = case.element_count(),
            "Network element added"
        );

        self.record(case_id, payload).await;
        Ok(case)
    }

    /// Append an information entry to the element at `position`.
    pub async fn add_entry(
        &self,
        case_id: &CaseId,
        position: usize,
        side: InfoSide,
        key: &str,
        value: &str,
    ) -> Result<Case> {
        let mut case = self.repo.load(case_id).await?;
        case.path.add_entry(position, side, key, value)?;
        self.repo.save(&case).await?;

        let name = case
            .path
            .element(position)
            .map(|e| e.name.clone())
            .unwrap_or_default();

        tracing::info!(case_id = %case_id, position, side = %side, key, "Information added");

        self.record(
            case_id,
            EventPayload::EntryAdded {
                position,
                name,
                side,
                key: key.to_string(),
                value: value.to_string(),
            },
        )
        .await;

        Ok(case)
    }

    /// Remove the element at `position`; later elements move up one place.
    pub async fn remove_element(&self, case_id: &CaseId, position: usize) -> Result<Case> {
        let mut case = self.repo.load(case_id).await?;
        let removed = case.path.remove(position)?;
        self.repo.save(&case).await?;

        tracing::info!(
            case_id = %case_id,
            position,
            name = %removed.name,
            "Network element removed"
        );

        self.record(
            case_id,
            EventPayload::ElementRemoved {
                position,
                name: removed.name,
            },
        )
        .await;

        Ok(case)
    }

    // ── Analysis ─────────────────────────────────────────────────

    /// Classify the current path. Always recomputed, never cached.
    pub async fn classify(&self, case_id: &CaseId) -> Result<AnalysisSummary> {
        let case = self.repo.load(case_id).await?;
        Ok(classify::classify(&case.path, self.pivot_rule))
    }

    /// Render the report of a case from a fresh classification.
    pub async fn generate_report(&self, case_id: &CaseId) -> Result<GeneratedReport> {
        let case = self.repo.load(case_id).await?;
        let summary = classify::classify(&case.path, self.pivot_rule);
        let generated_at = self.now();

        let text = report::render_report(&case, &summary, generated_at);

        self.record(
            case_id,
            EventPayload::ReportGenerated {
                element_count: case.element_count(),
                direct_traversals: summary.direct_traversals,
                lateral_movements: summary.lateral_movements,
                pivot_points: summary.pivot_points,
            },
        )
        .await;

        Ok(GeneratedReport {
            report: report::build_report(&case, summary, generated_at),
            text,
        })
    }

    /// Render a shareable export. Writing it anywhere is left to the caller.
    pub async fn export_case(&self, case_id: &CaseId) -> Result<CaseExport> {
        let case = self.repo.load(case_id).await?;
        let summary = classify::classify(&case.path, self.pivot_rule);
        let exported_at = self.now();

        let contents = export::render_export(&case, &summary, exported_at)?;
        let content_hash = export::document_hash(&case)?;

        tracing::info!(case_id = %case_id, content_hash = %content_hash, "Case exported");

        self.record(
            case_id,
            EventPayload::CaseExported {
                content_hash: content_hash.clone(),
            },
        )
        .await;

        Ok(CaseExport {
            file_name: export::export_file_name(case_id, exported_at),
            contents,
            content_hash,
        })
    }

    /// Append to the activity log. A failing log never fails the operation.
    async fn record(&self, case_id: &CaseId, payload: EventPayload) {
        let event = CaseEvent::at(case_id.clone(), payload, self.now());
        if let Err(e) = self.repo.append_event(&event).await {
            tracing::warn!(
                case_id = %case_id,
                action = event.action(),
                error = %e,
                "Failed to record case event"
            );
        }
    }
}
