//! Read operations for the case document store.

use neo4rs::query;

use tracer_core::CaseId;

use crate::client::{GraphClient, GraphError};

impl GraphClient {
    /// The serialized document of a case, if it exists.
    pub async fn fetch_case_document(
        &self,
        case_id: &CaseId,
    ) -> Result<Option<String>, GraphError> {
        let q = query("MATCH (c:Case {case_id: $case_id}) RETURN c.document AS document")
            .param("case_id", case_id.to_string());

        match self.query_one(q).await? {
            Some(row) => {
                let document: String = row.get("document").map_err(|e| {
                    GraphError::Serialization(format!("Failed to read case document: {e}"))
                })?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    /// All stored case identifiers in lexical (creation) order.
    pub async fn list_case_ids(&self) -> Result<Vec<String>, GraphError> {
        let q = query("MATCH (c:Case) RETURN c.case_id AS case_id ORDER BY c.case_id");

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                row.get::<String>("case_id").map_err(|e| {
                    GraphError::Serialization(format!("Failed to read case id: {e}"))
                })
            })
            .collect()
    }

    pub async fn case_exists(&self, case_id: &CaseId) -> Result<bool, GraphError> {
        let q = query("MATCH (c:Case {case_id: $case_id}) RETURN count(c) AS n")
            .param("case_id", case_id.to_string());

        let count = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("n").map_err(|e| {
                GraphError::Serialization(format!("Failed to read case count: {e}"))
            })?,
            None => 0,
        };
        Ok(count > 0)
    }

    /// Serialized activity events of a case, oldest first.
    pub async fn fetch_case_event_documents(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<String>, GraphError> {
        let q = query(
            "MATCH (:Case {case_id: $case_id})-[:HAS_EVENT]->(e:CaseEvent)
             RETURN e.document AS document
             ORDER BY e.timestamp, e.event_id",
        )
        .param("case_id", case_id.to_string());

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                row.get::<String>("document").map_err(|e| {
                    GraphError::Serialization(format!("Failed to read event document: {e}"))
                })
            })
            .collect()
    }
}
