//! Routes and handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use tracer_core::{Case, CaseEvent, CaseId, InsertionPoint};
use tracer_engine::{CaseListing, ElementRequest, GeneratedReport};
use tracer_store::CaseRepository;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

// ── Payloads ─────────────────────────────────────────────────────

/// A new case, optionally with the hops already known at detection time.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCaseRequest {
    pub threat_type: String,
    pub source_ip: String,
    pub destination_ip: String,
    #[serde(default)]
    pub network_elements: Vec<ElementRequest>,
}

/// An element to add. Without `position` it is appended before the
/// destination.
#[derive(Debug, Deserialize)]
pub struct AddElementRequest {
    #[serde(default)]
    pub position: Option<usize>,
    #[serde(flatten)]
    pub element: ElementRequest,
}

// ── Router ───────────────────────────────────────────────────────

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/cases", get(list_cases_handler).post(create_case_handler))
        .route("/cases/{case_id}", get(get_case_handler))
        .route(
            "/cases/{case_id}/insertion-points",
            get(insertion_points_handler),
        )
        .route("/cases/{case_id}/elements", post(add_element_handler))
        .route("/cases/{case_id}/report", get(report_handler))
        .route("/cases/{case_id}/history", get(history_handler))
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────

async fn root_handler() -> Json<Value> {
    Json(json!({
        "name": "TRACER API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /health",
            "GET /cases",
            "POST /cases",
            "GET /cases/{case_id}",
            "GET /cases/{case_id}/insertion-points",
            "POST /cases/{case_id}/elements",
            "GET /cases/{case_id}/report",
            "GET /cases/{case_id}/history",
        ],
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let repo = state.engine.repository();
    Json(json!({
        "status": if repo.is_degraded() { "degraded" } else { "healthy" },
        "storage": repo.backend(),
    }))
}

async fn list_cases_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<CaseListing>>> {
    Ok(Json(state.engine.list_cases().await?))
}

async fn create_case_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateCaseRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Case>)> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let elements = request
        .network_elements
        .into_iter()
        .map(ElementRequest::into_element)
        .collect::<Result<Vec<_>, _>>()?;

    let case = state
        .engine
        .new_case_with_elements(
            &request.threat_type,
            &request.source_ip,
            &request.destination_ip,
            elements,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(case)))
}

async fn get_case_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> ApiResult<Json<Case>> {
    let case_id = CaseId::parse(&case_id)?;
    Ok(Json(state.engine.retrieve(&case_id).await?))
}

async fn insertion_points_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> ApiResult<Json<Vec<InsertionPoint>>> {
    let case_id = CaseId::parse(&case_id)?;
    Ok(Json(state.engine.insertion_points(&case_id).await?))
}

async fn add_element_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    payload: Result<Json<AddElementRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Case>)> {
    let case_id = CaseId::parse(&case_id)?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let element = request.element.into_element()?;

    let case = match request.position {
        Some(position) => state.engine.add_element(&case_id, position, element).await?,
        None => state.engine.append_element(&case_id, element).await?,
    };
    Ok((StatusCode::CREATED, Json(case)))
}

async fn report_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> ApiResult<Json<GeneratedReport>> {
    let case_id = CaseId::parse(&case_id)?;
    Ok(Json(state.engine.generate_report(&case_id).await?))
}

async fn history_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> ApiResult<Json<Vec<CaseEvent>>> {
    let case_id = CaseId::parse(&case_id)?;
    Ok(Json(state.engine.history(&case_id).await?))
}
