use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{IntakeId, StagePayload};
use super::eligibility::{determine_eligibility, EligibilityInput};
use super::repository::WorkflowRepository;
use super::service::{IntakeService, IntakeServiceError};
use super::validation::{validate_stage_number, ValidationContext};
use super::workflow::WorkflowError;
use crate::workflows::repository::RepositoryError;

const DEFAULT_LIST_LIMIT: usize = 50;

/// Router builder exposing the intake workflow over HTTP.
pub fn intake_router<R>(service: Arc<IntakeService<R>>) -> Router
where
    R: WorkflowRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/intakes",
            post(start_handler::<R>).get(list_handler::<R>),
        )
        .route("/api/v1/intakes/:intake_id", get(record_handler::<R>))
        .route(
            "/api/v1/intakes/:intake_id/progress",
            get(progress_handler::<R>),
        )
        .route(
            "/api/v1/intakes/:intake_id/readiness",
            get(readiness_handler::<R>),
        )
        .route(
            "/api/v1/intakes/:intake_id/eligibility",
            get(eligibility_handler::<R>),
        )
        .route(
            "/api/v1/intakes/:intake_id/stages/:stage",
            put(save_stage_handler::<R>),
        )
        .route(
            "/api/v1/intakes/:intake_id/stages/:stage/complete",
            post(complete_stage_handler::<R>),
        )
        .route(
            "/api/v1/intakes/:intake_id/stages/:stage/reopen",
            post(reopen_stage_handler::<R>),
        )
        .route("/api/v1/intakes/:intake_id/submit", post(submit_handler::<R>))
        .route("/api/v1/eligibility", post(calculate_eligibility_handler))
        .route("/api/v1/validation/stages/:stage", post(validate_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    limit: Option<usize>,
}

pub(crate) async fn start_handler<R>(State(service): State<Arc<IntakeService<R>>>) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.start() {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    match service.open_intakes(limit) {
        Ok(records) => {
            let summaries: Vec<_> = records
                .iter()
                .map(|record| service.orchestrator().progress(record))
                .collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Path(intake_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.get(&IntakeId(intake_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn progress_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Path(intake_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.progress(&IntakeId(intake_id)) {
        Ok(progress) => (StatusCode::OK, Json(progress)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn readiness_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Path(intake_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.readiness(&IntakeId(intake_id)) {
        Ok(readiness) => (StatusCode::OK, Json(readiness)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn eligibility_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Path(intake_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.eligibility(&IntakeId(intake_id)) {
        Ok(Some(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "housing history has not been recorded",
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_stage_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Path((intake_id, stage)): Path<(String, u8)>,
    Json(payload): Json<StagePayload>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.save_stage(&IntakeId(intake_id), stage, payload) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_stage_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Path((intake_id, stage)): Path<(String, u8)>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.complete_stage(&IntakeId(intake_id), stage) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reopen_stage_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Path((intake_id, stage)): Path<(String, u8)>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.reopen_stage(&IntakeId(intake_id), stage) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<IntakeService<R>>>,
    Path(intake_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
{
    match service.submit(&IntakeId(intake_id)) {
        Ok(record) => (StatusCode::ACCEPTED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn calculate_eligibility_handler(Json(input): Json<EligibilityInput>) -> Response {
    (StatusCode::OK, Json(determine_eligibility(&input))).into_response()
}

/// Stateless validation of a single payload, without cross-stage context.
pub(crate) async fn validate_handler(
    Path(stage): Path<u8>,
    Json(payload): Json<StagePayload>,
) -> Response {
    let context = ValidationContext::new(Utc::now().date_naive());
    let report = validate_stage_number(stage, &payload, &context);
    (StatusCode::OK, Json(report)).into_response()
}

fn error_response(error: IntakeServiceError) -> Response {
    let status = match &error {
        IntakeServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        IntakeServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::VersionConflict { .. },
        ) => StatusCode::CONFLICT,
        IntakeServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        IntakeServiceError::Workflow(WorkflowError::BlockingFindings { stage, errors }) => {
            let payload = json!({
                "error": error.to_string(),
                "stage": stage.number(),
                "errors": errors,
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
        IntakeServiceError::Workflow(
            WorkflowError::StageAlreadyComplete(_) | WorkflowError::AlreadySubmitted,
        ) => StatusCode::CONFLICT,
        IntakeServiceError::Workflow(
            WorkflowError::UnknownStage(_) | WorkflowError::PayloadMismatch { .. },
        ) => StatusCode::BAD_REQUEST,
        IntakeServiceError::Workflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
