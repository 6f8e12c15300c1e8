//! File-system backed case repository.
//!
//! Stores each case as a pretty-printed JSON document and its activity log
//! as JSON lines:
//! ```text
//! {root}/
//!   cases/
//!     {case_id}.json
//!   logs/
//!     {case_id}.jsonl
//! ```
//!
//! Documents are written to a uniquely named temporary file in the same
//! directory and then renamed over the target, so a reader sees either the
//! previous or the new document, never a partial one. New cases are hard
//! linked into place instead, so two creators can never claim the same id.
//! Cases live in separate files, so operations on different cases never
//! contend.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use tracer_core::{Case, CaseEvent, CaseId};

use crate::repository::{CaseRepository, StorageBackend, StoreError};

const CASES_DIR: &str = "cases";
const LOGS_DIR: &str = "logs";

/// File-system backed case store.
#[derive(Debug, Clone)]
pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    /// Open a store rooted at the given directory, creating it if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(CASES_DIR)).await?;
        fs::create_dir_all(root.join(LOGS_DIR)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn case_path(&self, case_id: &CaseId) -> PathBuf {
        self.root.join(CASES_DIR).join(format!("{case_id}.json"))
    }

    fn log_path(&self, case_id: &CaseId) -> PathBuf {
        self.root.join(LOGS_DIR).join(format!("{case_id}.jsonl"))
    }

    /// Write the document to a fresh temporary file next to its target.
    async fn write_temp(&self, case: &Case) -> Result<PathBuf, StoreError> {
        let tmp = self
            .root
            .join(CASES_DIR)
            .join(format!(".{}.{}.tmp", case.case_id, Uuid::new_v4()));

        let json = serde_json::to_vec_pretty(case)?;
        fs::write(&tmp, &json).await?;
        Ok(tmp)
    }
}

impl CaseRepository for FileRepository {
    async fn save(&self, case: &Case) -> Result<(), StoreError> {
        let path = self.case_path(&case.case_id);
        let tmp = self.write_temp(case).await?;

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(
            case_id = %case.case_id,
            path = %path.display(),
            "Case saved"
        );

        Ok(())
    }

    async fn create(&self, case: &Case) -> Result<(), StoreError> {
        let path = self.case_path(&case.case_id);
        let tmp = self.write_temp(case).await?;

        // Linking fails if the target exists, unlike rename which replaces it.
        let linked = fs::hard_link(&tmp, &path).await;
        let _ = fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(case.case_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(
            case_id = %case.case_id,
            path = %path.display(),
            "Case created"
        );

        Ok(())
    }

    async fn load(&self, case_id: &CaseId) -> Result<Case, StoreError> {
        match fs::read(self.case_path(case_id)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::CaseNotFound(case_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<CaseId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(self.root.join(CASES_DIR)).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".json") {
                match CaseId::parse(stem) {
                    Ok(id) => ids.push(id),
                    Err(_) => tracing::debug!(file = %name, "Skipping unrecognized case file"),
                }
            }
        }

        // Identifiers are timestamp-prefixed, so lexical order is creation order.
        ids.sort();
        Ok(ids)
    }

    async fn exists(&self, case_id: &CaseId) -> Result<bool, StoreError> {
        Ok(fs::try_exists(self.case_path(case_id)).await?)
    }

    async fn append_event(&self, event: &CaseEvent) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(&event.case_id))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn events(&self, case_id: &CaseId) -> Result<Vec<CaseEvent>, StoreError> {
        let contents = match fs::read_to_string(self.log_path(case_id)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tracer_core::events::EventPayload;
    use tracer_core::{ElementType, InfoSide, MovementType, NetworkElement, NetworkPath};

    fn sample_case(second: u32) -> Case {
        let created_at = Utc.with_ymd_and_hms(2024, 10, 15, 14, 30, second).unwrap();
        let mut path = NetworkPath::new("192.168.1.100", "10.0.0.50").unwrap();
        path.push(
            NetworkElement::new(ElementType::Firewall, "ASA-5525", MovementType::Direct)
                .unwrap()
                .with_entry(InfoSide::Source, "interface", "GigabitEthernet0/1")
                .unwrap()
                .with_entry(InfoSide::Destination, "interface", "GigabitEthernet0/2")
                .unwrap(),
        );
        path.push(
            NetworkElement::new(
                ElementType::Other("NAC".to_string()),
                "ise-01",
                MovementType::Lateral,
            )
            .unwrap(),
        );
        Case::new(CaseId::from_timestamp(created_at), "SQL Injection", path, created_at)
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRepository::open(dir.path()).await.unwrap();
        let case = sample_case(0);

        store.save(&case).await.unwrap();
        let loaded = store.load(&case.case_id).await.unwrap();

        assert_eq!(loaded, case);
        assert!(store.exists(&case.case_id).await.unwrap());
    }

    #[tokio::test]
    async fn save_overwrites_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRepository::open(dir.path()).await.unwrap();
        let mut case = sample_case(0);
        store.save(&case).await.unwrap();

        case.path.remove(2).unwrap();
        store.save(&case).await.unwrap();

        let loaded = store.load(&case.case_id).await.unwrap();
        assert_eq!(loaded.element_count(), 1);
    }

    #[tokio::test]
    async fn save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRepository::open(dir.path()).await.unwrap();
        store.save(&sample_case(0)).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join(CASES_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["CASE_20241015_143000.json".to_string()]);
    }

    #[tokio::test]
    async fn create_refuses_taken_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRepository::open(dir.path()).await.unwrap();
        let first = sample_case(0);
        store.create(&first).await.unwrap();

        let mut second = sample_case(0);
        second.threat_type = "Ransomware".to_string();
        let result = store.create(&second).await;

        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
        assert_eq!(store.load(&first.case_id).await.unwrap(), first);

        let names: Vec<String> = std::fs::read_dir(dir.path().join(CASES_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["CASE_20241015_143000.json".to_string()]);
    }

    #[tokio::test]
    async fn load_missing_case_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRepository::open(dir.path()).await.unwrap();
        let id = CaseId::parse("CASE_20000101_000000").unwrap();

        let result = store.load(&id).await;
        assert!(matches!(result, Err(StoreError::CaseNotFound(_))));
        assert!(!store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_sorted_and_skips_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRepository::open(dir.path()).await.unwrap();
        store.save(&sample_case(9)).await.unwrap();
        store.save(&sample_case(3)).await.unwrap();
        std::fs::write(dir.path().join(CASES_DIR).join(".partial.tmp"), b"{").unwrap();
        std::fs::write(dir.path().join(CASES_DIR).join("notes.txt"), b"x").unwrap();

        let ids = store.list().await.unwrap();
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["CASE_20241015_143003", "CASE_20241015_143009"]);
    }

    #[tokio::test]
    async fn events_append_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRepository::open(dir.path()).await.unwrap();
        let case = sample_case(0);

        let created = CaseEvent::new(
            case.case_id.clone(),
            EventPayload::CaseCreated {
                threat_type: case.threat_type.clone(),
                source_ip: "192.168.1.100".to_string(),
                destination_ip: "10.0.0.50".to_string(),
            },
        );
        let removed = CaseEvent::new(
            case.case_id.clone(),
            EventPayload::ElementRemoved {
                position: 2,
                name: "ise-01".to_string(),
            },
        );
        store.append_event(&created).await.unwrap();
        store.append_event(&removed).await.unwrap();

        let events = store.events(&case.case_id).await.unwrap();
        assert_eq!(events, vec![created, removed]);
    }

    #[tokio::test]
    async fn events_for_unknown_case_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRepository::open(dir.path()).await.unwrap();
        let id = CaseId::parse("CASE_20000101_000000").unwrap();
        assert!(store.events(&id).await.unwrap().is_empty());
    }
}
