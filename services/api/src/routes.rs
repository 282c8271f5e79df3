use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use school_clearance::workflows::clearance::{
    clearance_router, ClearanceService, ClearanceStore, NotificationEmitter,
};
use school_clearance::workflows::discipline::{
    discipline_router, DisciplinaryRecordStore, DisciplinaryService, StudentLookup,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes<S, D, N, L>(
    clearance: Arc<ClearanceService<S, D, N>>,
    discipline: Arc<DisciplinaryService<L, D>>,
) -> axum::Router
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
    L: StudentLookup + 'static,
{
    clearance_router(clearance)
        .merge(discipline_router(discipline))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
