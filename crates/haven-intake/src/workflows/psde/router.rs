use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::access::ViewerContext;
use super::correction::{BackdatedEntry, CorrectionError, CorrectionRequest, FamilyChange};
use super::domain::{FamilyId, PsdePayload};
use super::repository::PsdeRepository;
use super::service::{PsdeService, PsdeServiceError};
use crate::workflows::repository::RepositoryError;

pub const USER_HEADER: &str = "x-user-id";
pub const ROLES_HEADER: &str = "x-user-roles";

/// Router builder exposing record families over HTTP. Callers identify
/// themselves through the user and roles headers.
pub fn psde_router<R>(service: Arc<PsdeService<R>>) -> Router
where
    R: PsdeRepository + 'static,
{
    Router::new()
        .route("/api/v1/psde", post(create_handler::<R>))
        .route("/api/v1/psde/:family_id", get(view_handler::<R>))
        .route("/api/v1/psde/:family_id/history", get(history_handler::<R>))
        .route("/api/v1/psde/:family_id/audit", get(audit_handler::<R>))
        .route(
            "/api/v1/psde/:family_id/compliance",
            get(compliance_handler::<R>),
        )
        .route("/api/v1/psde/:family_id/versions", post(update_handler::<R>))
        .route(
            "/api/v1/psde/:family_id/corrections",
            post(correction_handler::<R>),
        )
        .route("/api/v1/psde/:family_id/backdate", post(backdate_handler::<R>))
        .route("/api/v1/psde/:family_id/approve", post(approve_handler::<R>))
        .route("/api/v1/psde/:family_id/delete", post(delete_handler::<R>))
        .route("/api/v1/psde/:family_id/seal", post(seal_handler::<R>))
        .route("/api/v1/psde/:family_id/unseal", post(unseal_handler::<R>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateBody {
    previous_version: u32,
    payload: PsdePayload,
    #[serde(default)]
    idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CorrectionBody {
    previous_version: u32,
    #[serde(flatten)]
    request: CorrectionRequest,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BackdateBody {
    previous_version: u32,
    #[serde(flatten)]
    entry: BackdatedEntry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteBody {
    previous_version: u32,
    justification: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApproveBody {
    previous_version: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SealBody {
    reason: String,
}

/// Reads the caller from headers; roles are a comma-separated list.
pub fn viewer_from_headers(headers: &HeaderMap) -> Option<ViewerContext> {
    let user_id = headers
        .get(USER_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    let roles = headers
        .get(ROLES_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_ascii_uppercase);
    Some(ViewerContext::new(user_id, roles))
}

/// Write responses pass through the same redaction as reads.
fn redacted<R>(service: &PsdeService<R>, viewer: &ViewerContext, change: &FamilyChange) -> Value
where
    R: PsdeRepository + 'static,
{
    service
        .policy()
        .redact_record(viewer, &change.record, change.family.seal())
}

fn unauthenticated() -> Response {
    let payload = json!({
        "error": format!("missing {USER_HEADER} header"),
    });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    headers: HeaderMap,
    Json(payload): Json<PsdePayload>,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.create(payload, &viewer) {
        Ok(change) => {
            (StatusCode::CREATED, Json(redacted(&service, &viewer, &change))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn view_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.view(&FamilyId(family_id), &viewer) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.history(&FamilyId(family_id), &viewer) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn audit_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.audit_trail(&FamilyId(family_id), &viewer) {
        Ok(trail) => {
            let payload = json!({
                "summary": trail.summary(),
                "entries": trail.entries(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn compliance_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.compliance(&FamilyId(family_id), &viewer) {
        Ok(score) => (StatusCode::OK, Json(score)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.update(
        &FamilyId(family_id),
        body.previous_version,
        body.payload,
        body.idempotency_key,
        &viewer,
    ) {
        Ok(change) => {
            (StatusCode::OK, Json(redacted(&service, &viewer, &change))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn correction_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CorrectionBody>,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.correct(
        &FamilyId(family_id),
        body.previous_version,
        body.request,
        &viewer,
    ) {
        Ok(change) => {
            let status = if change.replayed {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(redacted(&service, &viewer, &change))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn backdate_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<BackdateBody>,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.backdate(
        &FamilyId(family_id),
        body.previous_version,
        body.entry,
        &viewer,
    ) {
        Ok(change) => {
            (StatusCode::CREATED, Json(redacted(&service, &viewer, &change))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ApproveBody>,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.approve(&FamilyId(family_id), body.previous_version, &viewer) {
        Ok(change) => {
            (StatusCode::OK, Json(redacted(&service, &viewer, &change))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<DeleteBody>,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.delete(
        &FamilyId(family_id),
        body.previous_version,
        &body.justification,
        &viewer,
    ) {
        Ok(change) => {
            (StatusCode::OK, Json(redacted(&service, &viewer, &change))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn seal_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<SealBody>,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.seal(&FamilyId(family_id), &body.reason, &viewer) {
        Ok(family) => (StatusCode::OK, Json(json!({ "seal": family.seal() }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn unseal_handler<R>(
    State(service): State<Arc<PsdeService<R>>>,
    Path(family_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PsdeRepository + 'static,
{
    let Some(viewer) = viewer_from_headers(&headers) else {
        return unauthenticated();
    };
    match service.unseal(&FamilyId(family_id), &viewer) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: PsdeServiceError) -> Response {
    let status = match &error {
        PsdeServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        PsdeServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::VersionConflict { .. },
        ) => StatusCode::CONFLICT,
        PsdeServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        PsdeServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        PsdeServiceError::Correction(CorrectionError::InvalidPayload(errors)) => {
            let payload = json!({
                "error": error.to_string(),
                "errors": errors,
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
        PsdeServiceError::Correction(CorrectionError::StaleVersion { current, .. }) => {
            let payload = json!({
                "error": error.to_string(),
                "current_version": current,
            });
            return (StatusCode::CONFLICT, Json(payload)).into_response();
        }
        PsdeServiceError::Correction(CorrectionError::UnknownVersion(_)) => StatusCode::NOT_FOUND,
        PsdeServiceError::Correction(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
