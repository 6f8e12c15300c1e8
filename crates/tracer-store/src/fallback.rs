//! Graph store with automatic fallback to file storage.
//!
//! Every call goes to the primary store while it is healthy. An operational
//! failure (connection loss, timeout, driver error) is retried once; a second
//! failure marks the repository degraded and the call, along with every later
//! call in this process, is served by the file store. Degradation is never
//! reversed, so a single case is not split across two stores mid-session.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::timeout;

use tracer_core::config::{BackendChoice, StorageSettings};
use tracer_core::{Case, CaseEvent, CaseId};

use crate::file::FileRepository;
use crate::graph::GraphRepository;
use crate::repository::{CaseRepository, StorageBackend, StoreError};

const ATTEMPTS: u32 = 2;
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// The repository used by the CLI and the API server.
pub type DefaultRepository = FallbackRepository<GraphRepository>;

/// A primary store shadowed by a file store.
pub struct FallbackRepository<P> {
    primary: Option<P>,
    file: FileRepository,
    degraded: AtomicBool,
    op_timeout: Duration,
}

impl<P: CaseRepository> FallbackRepository<P> {
    pub fn new(primary: P, file: FileRepository) -> Self {
        Self {
            primary: Some(primary),
            file,
            degraded: AtomicBool::new(false),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// File storage only, by choice.
    pub fn file_only(file: FileRepository) -> Self {
        Self {
            primary: None,
            file,
            degraded: AtomicBool::new(false),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// File storage only, because the primary could not be reached at startup.
    pub fn degraded(file: FileRepository) -> Self {
        Self {
            primary: None,
            file,
            degraded: AtomicBool::new(true),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Bound on each primary call before it counts as a failure.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Whether the primary failed and the file store took over.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn file(&self) -> &FileRepository {
        &self.file
    }

    fn active_primary(&self) -> Option<&P> {
        if self.is_degraded() {
            return None;
        }
        self.primary.as_ref()
    }

    fn degrade(&self, op: &'static str, reason: &str) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                op,
                reason,
                data_dir = %self.file.root().display(),
                "Graph store failed, falling back to file storage"
            );
        }
    }

    /// Run `call` against the primary with retry and timeout.
    ///
    /// Returns `None` when the call must be served by the file store instead.
    async fn guarded<'p, T, F, Fut>(&'p self, op: &'static str, call: F) -> Option<Result<T, StoreError>>
    where
        T: Send,
        F: Fn(&'p P) -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
    {
        let primary = self.active_primary()?;
        let mut last_failure = String::new();

        for attempt in 1..=ATTEMPTS {
            match timeout(self.op_timeout, call(primary)).await {
                Ok(Ok(value)) => return Some(Ok(value)),
                Ok(Err(e)) if !e.is_operational() => return Some(Err(e)),
                Ok(Err(e)) => {
                    tracing::debug!(op, attempt, error = %e, "Graph store call failed");
                    last_failure = e.to_string();
                }
                Err(_) => {
                    tracing::debug!(op, attempt, "Graph store call timed out");
                    last_failure = format!("timed out after {:?}", self.op_timeout);
                }
            }
        }

        self.degrade(op, &last_failure);
        None
    }
}

impl<P: CaseRepository> CaseRepository for FallbackRepository<P> {
    async fn save(&self, case: &Case) -> Result<(), StoreError> {
        if let Some(result) = self.guarded("save", |p| p.save(case)).await {
            return result;
        }
        self.file.save(case).await
    }

    async fn create(&self, case: &Case) -> Result<(), StoreError> {
        if let Some(result) = self.guarded("create", |p| p.create(case)).await {
            return result;
        }
        self.file.create(case).await
    }

    async fn load(&self, case_id: &CaseId) -> Result<Case, StoreError> {
        if let Some(result) = self.guarded("load", |p| p.load(case_id)).await {
            return result;
        }
        self.file.load(case_id).await
    }

    async fn list(&self) -> Result<Vec<CaseId>, StoreError> {
        if let Some(result) = self.guarded("list", |p| p.list()).await {
            return result;
        }
        self.file.list().await
    }

    async fn exists(&self, case_id: &CaseId) -> Result<bool, StoreError> {
        if let Some(result) = self.guarded("exists", |p| p.exists(case_id)).await {
            return result;
        }
        self.file.exists(case_id).await
    }

    async fn append_event(&self, event: &CaseEvent) -> Result<(), StoreError> {
        if let Some(result) = self.guarded("append_event", |p| p.append_event(event)).await {
            return result;
        }
        self.file.append_event(event).await
    }

    async fn events(&self, case_id: &CaseId) -> Result<Vec<CaseEvent>, StoreError> {
        if let Some(result) = self.guarded("events", |p| p.events(case_id)).await {
            return result;
        }
        self.file.events(case_id).await
    }

    fn backend(&self) -> StorageBackend {
        match self.active_primary() {
            Some(primary) => primary.backend(),
            None => StorageBackend::File,
        }
    }
}

/// Build the process-wide repository from configuration.
///
/// Selection: a forced backend wins; under `auto` the graph store is used
/// when a URI is configured. If the graph store cannot be reached after two
/// bounded attempts the repository starts degraded on file storage.
pub async fn open_repository(settings: &StorageSettings) -> Result<DefaultRepository, StoreError> {
    let file = FileRepository::open(&settings.data_dir).await?;

    let wants_graph = match settings.backend {
        BackendChoice::File => false,
        BackendChoice::Graph => true,
        BackendChoice::Auto => settings.graph.uri.is_some(),
    };

    if !wants_graph {
        tracing::info!(data_dir = %settings.data_dir, "Using file storage");
        return Ok(FallbackRepository::file_only(file));
    }

    let uri = settings.graph.uri_or_default();
    for attempt in 1..=ATTEMPTS {
        match timeout(
            settings.connect_timeout(),
            GraphRepository::connect(&settings.graph),
        )
        .await
        {
            Ok(Ok(graph)) => {
                tracing::info!(uri = %uri, "Using graph storage");
                return Ok(FallbackRepository::new(graph, file).with_op_timeout(settings.op_timeout()));
            }
            Ok(Err(e)) => {
                tracing::warn!(uri = %uri, attempt, error = %e, "Graph store connection failed");
            }
            Err(_) => {
                tracing::warn!(
                    uri = %uri,
                    attempt,
                    timeout_ms = settings.connect_timeout_ms,
                    "Graph store connection timed out"
                );
            }
        }
    }

    tracing::warn!(
        uri = %uri,
        data_dir = %settings.data_dir,
        "Graph store unreachable, falling back to file storage"
    );
    Ok(FallbackRepository::degraded(file))
}
