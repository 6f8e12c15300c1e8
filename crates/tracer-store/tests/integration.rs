//! Integration tests for the graph-backed case repository against a live
//! Neo4j instance.
//!
//! Run with: cargo test --package tracer-store --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available.

use chrono::{TimeZone, Utc};

use tracer_core::config::GraphSettings;
use tracer_core::{
    Case, CaseEvent, CaseId, ElementType, EventPayload, InfoSide, MovementType, NetworkElement,
    NetworkPath,
};
use tracer_store::{CaseRepository, GraphRepository, StorageBackend, StoreError};

async fn connect_or_skip() -> Option<GraphRepository> {
    let settings = GraphSettings {
        uri: Some(
            std::env::var("TRACER_TEST_NEO4J_URI")
                .unwrap_or_else(|_| "bolt://localhost:7687".to_string()),
        ),
        password: std::env::var("TRACER_TEST_NEO4J_PASSWORD").unwrap_or_default(),
        ..GraphSettings::default()
    };
    match GraphRepository::connect(&settings).await {
        Ok(repo) => Some(repo),
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

/// A case id no other test run will collide with.
fn unique_case_id() -> CaseId {
    let at = Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap();
    CaseId::from_timestamp(at).with_suffix(rand_suffix())
}

fn rand_suffix() -> u32 {
    uuid::Uuid::new_v4().as_u128() as u32
}

async fn cleanup(repo: &GraphRepository, case_id: &CaseId) {
    let q = neo4rs::query(
        "MATCH (c:Case {case_id: $case_id})
         OPTIONAL MATCH (c)-[:HAS_EVENT]->(e:CaseEvent)
         DETACH DELETE c, e",
    )
    .param("case_id", case_id.to_string());
    let _ = repo.client().run(q).await;
}

fn make_case(case_id: CaseId) -> Case {
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
        NetworkElement::new(ElementType::Switch, "Catalyst-3850", MovementType::Direct)
            .unwrap()
            .with_entry(InfoSide::Source, "port", "Gi1/0/24")
            .unwrap(),
    );
    Case::new(case_id, "SQL Injection", path, Utc::now())
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package tracer-store --test integration -- --ignored"]
async fn test_case_document_roundtrip() {
    let Some(repo) = connect_or_skip().await else {
        return;
    };
    let case_id = unique_case_id();
    let mut case = make_case(case_id.clone());

    repo.save(&case).await.unwrap();
    assert_eq!(repo.load(&case_id).await.unwrap(), case);
    assert!(repo.exists(&case_id).await.unwrap());
    assert_eq!(repo.backend(), StorageBackend::Graph);

    // Overwrite replaces the whole document.
    case.path.remove(1).unwrap();
    repo.save(&case).await.unwrap();
    let reloaded = repo.load(&case_id).await.unwrap();
    assert_eq!(reloaded.element_count(), 1);
    assert_eq!(reloaded.path.element(1).unwrap().name, "Catalyst-3850");

    assert!(repo.list().await.unwrap().contains(&case_id));

    cleanup(&repo, &case_id).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package tracer-store --test integration -- --ignored"]
async fn test_missing_case() {
    let Some(repo) = connect_or_skip().await else {
        return;
    };
    let case_id = unique_case_id();

    assert!(matches!(
        repo.load(&case_id).await,
        Err(StoreError::CaseNotFound(_))
    ));
    assert!(!repo.exists(&case_id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package tracer-store --test integration -- --ignored"]
async fn test_activity_log_order() {
    let Some(repo) = connect_or_skip().await else {
        return;
    };
    let case_id = unique_case_id();
    repo.save(&make_case(case_id.clone())).await.unwrap();

    let base = Utc::now();
    let events: Vec<CaseEvent> = (0..3)
        .map(|i| {
            CaseEvent::at(
                case_id.clone(),
                EventPayload::ElementRemoved {
                    position: i + 1,
                    name: format!("hop-{i}"),
                },
                base + chrono::Duration::milliseconds(i as i64),
            )
        })
        .collect();
    for event in &events {
        repo.append_event(event).await.unwrap();
    }

    assert_eq!(repo.events(&case_id).await.unwrap(), events);

    cleanup(&repo, &case_id).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package tracer-store --test integration -- --ignored"]
async fn test_create_claims_id_once() {
    let Some(repo) = connect_or_skip().await else {
        return;
    };
    let case_id = unique_case_id();
    let first = make_case(case_id.clone());
    repo.create(&first).await.unwrap();

    let mut second = make_case(case_id.clone());
    second.threat_type = "Ransomware".to_string();
    assert!(matches!(
        repo.create(&second).await,
        Err(StoreError::AlreadyExists(_))
    ));
    assert_eq!(repo.load(&case_id).await.unwrap(), first);

    cleanup(&repo, &case_id).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j: cargo test --package tracer-store --test integration -- --ignored"]
async fn test_event_for_missing_case_is_rejected() {
    let Some(repo) = connect_or_skip().await else {
        return;
    };
    let case_id = unique_case_id();
    let event = CaseEvent::at(
        case_id.clone(),
        EventPayload::ElementRemoved {
            position: 1,
            name: "hop-1".to_string(),
        },
        Utc::now(),
    );

    assert!(matches!(
        repo.append_event(&event).await,
        Err(StoreError::CaseNotFound(_))
    ));
}
