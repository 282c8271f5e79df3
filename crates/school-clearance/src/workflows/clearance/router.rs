use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Enrollment, RequestId};
use super::repository::{ClearanceStore, NotificationEmitter};
use super::service::{ClearanceError, ClearanceService, ErrorKind};
use crate::workflows::discipline::DisciplinaryRecordStore;
use crate::workflows::{FileRef, StaffId, StudentId};

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    pub(crate) student_id: StudentId,
    pub(crate) requirement_key: String,
    #[serde(default)]
    pub(crate) attachments: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApproveRequest {
    pub(crate) approver_id: StaffId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    pub(crate) approver_id: StaffId,
    #[serde(default)]
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkApproveRequest {
    pub(crate) approver_id: StaffId,
    pub(crate) request_ids: Vec<RequestId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) requirements: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PromoteRequest {
    pub(crate) grade_level: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DirectClearRequest {
    pub(crate) requirement_key: String,
    pub(crate) actor_id: StaffId,
}

/// Router builder exposing the clearance request workflow.
pub fn clearance_router<S, D, N>(service: Arc<ClearanceService<S, D, N>>) -> Router
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    Router::new()
        .route("/api/v1/clearance/requests", post(submit_handler::<S, D, N>))
        .route(
            "/api/v1/clearance/requests/bulk-approve",
            post(bulk_approve_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/requests/:request_id",
            get(review_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/requests/:request_id/approve",
            post(approve_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/requests/:request_id/reject",
            post(reject_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/approvers/:approver_id/queue",
            get(queue_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/students",
            post(enroll_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/students/:student_id",
            get(student_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/students/:student_id/requirements",
            post(assign_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/students/:student_id/promote",
            post(promote_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/students/:student_id/direct-clear",
            post(direct_clear_handler::<S, D, N>),
        )
        .route(
            "/api/v1/clearance/sections/:section/report",
            get(section_report_handler::<S, D, N>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    axum::Json(payload): axum::Json<SubmitRequest>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.submit(
        &payload.student_id,
        &payload.requirement_key,
        payload.attachments,
    ) {
        Ok(request) => (StatusCode::CREATED, axum::Json(request)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.review(&RequestId(request_id)) {
        Ok(context) => (StatusCode::OK, axum::Json(context)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(request_id): Path<String>,
    axum::Json(payload): axum::Json<ApproveRequest>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.approve(&RequestId(request_id), &payload.approver_id) {
        Ok(decision) => (StatusCode::OK, axum::Json(decision)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(request_id): Path<String>,
    axum::Json(payload): axum::Json<RejectRequest>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.reject(
        &RequestId(request_id),
        &payload.approver_id,
        &payload.reason,
    ) {
        Ok(decision) => (StatusCode::OK, axum::Json(decision)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bulk_approve_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    axum::Json(payload): axum::Json<BulkApproveRequest>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    let result = service.bulk_approve(&payload.request_ids, &payload.approver_id);
    (StatusCode::OK, axum::Json(result)).into_response()
}

pub(crate) async fn queue_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(approver_id): Path<String>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.pending_for_approver(&StaffId(approver_id)) {
        Ok(queue) => (StatusCode::OK, axum::Json(queue)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn student_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(student_id): Path<String>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.student(&StudentId(student_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn enroll_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    axum::Json(enrollment): axum::Json<Enrollment>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.enroll(enrollment) {
        Ok(student) => (StatusCode::CREATED, axum::Json(student)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assign_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(student_id): Path<String>,
    axum::Json(payload): axum::Json<AssignRequest>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    let requirements: Vec<&str> = payload.requirements.iter().map(String::as_str).collect();
    match service.assign_requirements(&StudentId(student_id), &requirements) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn promote_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(student_id): Path<String>,
    axum::Json(payload): axum::Json<PromoteRequest>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.promote(&StudentId(student_id), &payload.grade_level) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn direct_clear_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(student_id): Path<String>,
    axum::Json(payload): axum::Json<DirectClearRequest>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.direct_clear(
        &StudentId(student_id),
        &payload.requirement_key,
        &payload.actor_id,
    ) {
        Ok(cleared) => (StatusCode::OK, axum::Json(cleared)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn section_report_handler<S, D, N>(
    State(service): State<Arc<ClearanceService<S, D, N>>>,
    Path(section): Path<String>,
) -> Response
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    match service.section_report(&section) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: ClearanceError) -> Response {
    let kind = error.kind();
    let payload = json!({
        "error": error.to_string(),
        "kind": kind,
    });
    (status_for(kind), axum::Json(payload)).into_response()
}
