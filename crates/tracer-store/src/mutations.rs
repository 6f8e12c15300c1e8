//! Write operations for the case document store.
//!
//! A case is a single `(:Case)` node holding the serialized document; its
//! activity log hangs off it as `(:CaseEvent)` nodes via `[:HAS_EVENT]`.

use chrono::{SecondsFormat, Utc};
use neo4rs::query;
use uuid::Uuid;

use tracer_core::{Case, CaseEvent};

use crate::client::{GraphClient, GraphError};

impl GraphClient {
    // ── Schema ───────────────────────────────────────────────────

    /// Create the uniqueness constraint on case identifiers.
    pub async fn ensure_case_schema(&self) -> Result<(), GraphError> {
        self.run(query(
            "CREATE CONSTRAINT case_id_unique IF NOT EXISTS
             FOR (c:Case) REQUIRE c.case_id IS UNIQUE",
        ))
        .await?;

        tracing::debug!("Case schema ensured");
        Ok(())
    }

    // ── Documents ────────────────────────────────────────────────

    /// Replace the stored document of a case, creating the node if needed.
    ///
    /// The document is written with a single `SET`, so readers see either
    /// the previous or the new version.
    pub async fn upsert_case_document(&self, case: &Case) -> Result<(), GraphError> {
        let document = serde_json::to_string(case)
            .map_err(|e| GraphError::Serialization(e.to_string()))?;

        let q = query(
            "MERGE (c:Case {case_id: $case_id})
             ON CREATE SET c.created_at = $created_at
             SET c.document = $document, c.updated_at = $now",
        )
        .param("case_id", case.case_id.to_string())
        .param("created_at", case.created_at.to_rfc3339())
        .param("document", document)
        .param("now", Utc::now().to_rfc3339());

        self.run(q).await
    }

    /// Store the document of a new case unless the id is already taken.
    ///
    /// Returns `false` when a case with this id exists. The MERGE runs under
    /// the uniqueness constraint, so of two concurrent claims exactly one
    /// sees its own token on the node.
    pub async fn create_case_document(&self, case: &Case) -> Result<bool, GraphError> {
        let document = serde_json::to_string(case)
            .map_err(|e| GraphError::Serialization(e.to_string()))?;
        let claim = Uuid::new_v4().to_string();

        let q = query(
            "MERGE (c:Case {case_id: $case_id})
             ON CREATE SET c.created_at = $created_at, c.updated_at = $now,
                           c.document = $document, c.claim = $claim
             RETURN c.claim = $claim AS created",
        )
        .param("case_id", case.case_id.to_string())
        .param("created_at", case.created_at.to_rfc3339())
        .param("document", document)
        .param("now", Utc::now().to_rfc3339())
        .param("claim", claim);

        match self.query_one(q).await? {
            Some(row) => row.get::<bool>("created").map_err(|e| {
                GraphError::Serialization(format!("Failed to read create result: {e}"))
            }),
            None => Err(GraphError::Serialization(
                "case create returned no row".to_string(),
            )),
        }
    }

    // ── Activity Log ─────────────────────────────────────────────

    /// Attach an activity event to its case.
    ///
    /// Returns `false` when the case node does not exist and nothing was written.
    pub async fn create_case_event(&self, event: &CaseEvent) -> Result<bool, GraphError> {
        let document = serde_json::to_string(event)
            .map_err(|e| GraphError::Serialization(e.to_string()))?;

        // Nanosecond precision keeps lexical order equal to write order.
        let q = query(
            "MATCH (c:Case {case_id: $case_id})
             CREATE (c)-[:HAS_EVENT]->(:CaseEvent {
               event_id: $event_id, timestamp: $timestamp, document: $document
             })
             RETURN count(c) AS attached",
        )
        .param("case_id", event.case_id.to_string())
        .param("event_id", event.event_id.0.to_string())
        .param(
            "timestamp",
            event.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        )
        .param("document", document);

        let attached = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("attached").map_err(|e| {
                GraphError::Serialization(format!("Failed to read event result: {e}"))
            })?,
            None => 0,
        };
        Ok(attached > 0)
    }
}
