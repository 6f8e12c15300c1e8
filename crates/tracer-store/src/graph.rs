//! Neo4j-backed case repository.
//!
//! Each case is one `(:Case)` node keyed by `case_id` and holding the full
//! JSON document, so both repository variants persist the same logical shape.

use tracer_core::config::GraphSettings;
use tracer_core::{Case, CaseEvent, CaseId};

use crate::client::{GraphClient, GraphError};
use crate::repository::{CaseRepository, StorageBackend, StoreError};

/// Case store on top of a shared [`GraphClient`].
#[derive(Clone)]
pub struct GraphRepository {
    client: GraphClient,
}

impl GraphRepository {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Connect and make sure the case schema exists.
    pub async fn connect(settings: &GraphSettings) -> Result<Self, StoreError> {
        let client = GraphClient::connect(settings).await?;
        client.ensure_case_schema().await?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }
}

impl CaseRepository for GraphRepository {
    async fn save(&self, case: &Case) -> Result<(), StoreError> {
        self.client.upsert_case_document(case).await?;
        tracing::debug!(case_id = %case.case_id, "Case saved to graph store");
        Ok(())
    }

    async fn create(&self, case: &Case) -> Result<(), StoreError> {
        if !self.client.create_case_document(case).await? {
            return Err(StoreError::AlreadyExists(case.case_id.clone()));
        }
        tracing::debug!(case_id = %case.case_id, "Case created in graph store");
        Ok(())
    }

    async fn load(&self, case_id: &CaseId) -> Result<Case, StoreError> {
        match self.client.fetch_case_document(case_id).await? {
            Some(document) => Ok(serde_json::from_str(&document)?),
            None => Err(StoreError::CaseNotFound(case_id.clone())),
        }
    }

    async fn list(&self) -> Result<Vec<CaseId>, StoreError> {
        let raw = self.client.list_case_ids().await?;
        raw.iter()
            .map(|id| {
                CaseId::parse(id).map_err(|e| {
                    StoreError::Graph(GraphError::Serialization(format!(
                        "stored case id '{id}' is invalid: {e}"
                    )))
                })
            })
            .collect()
    }

    async fn exists(&self, case_id: &CaseId) -> Result<bool, StoreError> {
        Ok(self.client.case_exists(case_id).await?)
    }

    async fn append_event(&self, event: &CaseEvent) -> Result<(), StoreError> {
        if !self.client.create_case_event(event).await? {
            return Err(StoreError::CaseNotFound(event.case_id.clone()));
        }
        Ok(())
    }

    async fn events(&self, case_id: &CaseId) -> Result<Vec<CaseEvent>, StoreError> {
        let documents = self.client.fetch_case_event_documents(case_id).await?;
        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Graph
    }
}
