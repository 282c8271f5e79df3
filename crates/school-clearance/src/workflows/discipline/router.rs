use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{NewDisciplinaryRecord, Sanction, ViolationId};
use super::repository::{DisciplinaryRecordStore, StudentLookup};
use super::resolver::ClassResolution;
use super::service::{DisciplineError, DisciplinaryService};
use crate::workflows::{StoreError, StudentId};

#[derive(Debug, Deserialize)]
pub(crate) struct PreviewRequest {
    pub(crate) student_id: StudentId,
    pub(crate) violations: Vec<ViolationId>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub(crate) student_id: StudentId,
    pub(crate) classes: Vec<ClassResolution>,
    pub(crate) sanctions: Vec<Sanction>,
}

/// Router builder exposing sanction previews and the disciplinary log.
pub fn discipline_router<L, D>(service: Arc<DisciplinaryService<L, D>>) -> Router
where
    L: StudentLookup + 'static,
    D: DisciplinaryRecordStore + 'static,
{
    Router::new()
        .route("/api/v1/discipline/preview", post(preview_handler::<L, D>))
        .route("/api/v1/discipline/records", post(record_handler::<L, D>))
        .route(
            "/api/v1/discipline/students/:student_id/records",
            get(history_handler::<L, D>),
        )
        .with_state(service)
}

pub(crate) async fn preview_handler<L, D>(
    State(service): State<Arc<DisciplinaryService<L, D>>>,
    axum::Json(request): axum::Json<PreviewRequest>,
) -> Response
where
    L: StudentLookup + 'static,
    D: DisciplinaryRecordStore + 'static,
{
    match service.preview(&request.student_id, &request.violations) {
        Ok(proposal) => {
            let sanctions = proposal.sanctions();
            let payload = PreviewResponse {
                student_id: proposal.student_id,
                classes: proposal.classes,
                sanctions,
            };
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_handler<L, D>(
    State(service): State<Arc<DisciplinaryService<L, D>>>,
    axum::Json(new_record): axum::Json<NewDisciplinaryRecord>,
) -> Response
where
    L: StudentLookup + 'static,
    D: DisciplinaryRecordStore + 'static,
{
    match service.record(new_record) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<L, D>(
    State(service): State<Arc<DisciplinaryService<L, D>>>,
    Path(student_id): Path<String>,
) -> Response
where
    L: StudentLookup + 'static,
    D: DisciplinaryRecordStore + 'static,
{
    match service.history(&StudentId(student_id)) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: DisciplineError) -> Response {
    let status = match &error {
        DisciplineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DisciplineError::UnknownViolation(_) | DisciplineError::StudentNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        DisciplineError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
        DisciplineError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
