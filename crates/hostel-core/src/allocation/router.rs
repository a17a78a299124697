use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AssignmentId, BedId, HistoryFilter, HostelId, NewAssignment, RoomId,
};
use super::optimizer::{OptimizationParams, PendingRequest};
use super::rules::RequestContext;
use super::service::AllocationService;
use super::store::{AllocationStore, AvailabilityStore};
use super::AllocationError;

/// Router builder exposing the allocation core over HTTP.
pub fn allocation_router<S, V>(service: Arc<AllocationService<S, V>>) -> Router
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/allocation/assignments",
            post(assign_handler::<S, V>),
        )
        .route(
            "/api/v1/allocation/assignments/:assignment_id/complete",
            post(complete_handler::<S, V>),
        )
        .route(
            "/api/v1/allocation/assignments/:assignment_id/transfer",
            post(transfer_handler::<S, V>),
        )
        .route("/api/v1/allocation/history", get(history_handler::<S, V>))
        .route(
            "/api/v1/allocation/optimizations",
            post(optimize_handler::<S, V>),
        )
        .route(
            "/api/v1/allocation/rules/evaluate",
            post(evaluate_rules_handler::<S, V>),
        )
        .route(
            "/api/v1/allocation/rooms/:room_id/availability",
            get(availability_handler::<S, V>),
        )
        .route(
            "/api/v1/allocation/rooms/:room_id/alerts",
            get(alerts_handler::<S, V>),
        )
        .with_state(service)
}

fn error_response(error: AllocationError) -> Response {
    let status = match &error {
        AllocationError::Validation(_) | AllocationError::BusinessRule(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AllocationError::NotFound { .. } => StatusCode::NOT_FOUND,
        AllocationError::Conflict { .. } | AllocationError::NotAvailable { .. } => {
            StatusCode::CONFLICT
        }
        AllocationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &error {
        AllocationError::Conflict { conflicts } => json!({
            "error": error.to_string(),
            "conflicts": conflicts,
        }),
        _ => json!({ "error": error.to_string() }),
    };

    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn assign_handler<S, V>(
    State(service): State<Arc<AllocationService<S, V>>>,
    axum::Json(request): axum::Json<NewAssignment>,
) -> Response
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    match service.assign(request) {
        Ok(assignment) => (StatusCode::CREATED, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteRequest {
    actual_vacate: NaiveDate,
}

pub(crate) async fn complete_handler<S, V>(
    State(service): State<Arc<AllocationService<S, V>>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<CompleteRequest>,
) -> Response
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    let id = AssignmentId(assignment_id);
    match service.complete(&id, request.actual_vacate) {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransferRequest {
    new_bed_id: BedId,
    transfer_date: NaiveDate,
    #[serde(default)]
    reason: Option<String>,
}

pub(crate) async fn transfer_handler<S, V>(
    State(service): State<Arc<AllocationService<S, V>>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<TransferRequest>,
) -> Response
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    let id = AssignmentId(assignment_id);
    match service.transfer(
        &id,
        &request.new_bed_id,
        request.transfer_date,
        request.reason,
    ) {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    bed_id: Option<String>,
    #[serde(default)]
    assignment_id: Option<String>,
    #[serde(default)]
    occupant_id: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

pub(crate) async fn history_handler<S, V>(
    State(service): State<Arc<AllocationService<S, V>>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    let filter = HistoryFilter {
        bed_id: query.bed_id.map(BedId),
        assignment_id: query.assignment_id.map(AssignmentId),
        occupant_id: query.occupant_id.map(super::domain::OccupantId),
    };
    let limit = query.limit.unwrap_or(100);

    match service.history(&filter, limit) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptimizeRequest {
    hostel_id: HostelId,
    available_beds: Vec<BedId>,
    requests: Vec<PendingRequest>,
    #[serde(default)]
    params: Option<OptimizationParams>,
}

pub(crate) async fn optimize_handler<S, V>(
    State(service): State<Arc<AllocationService<S, V>>>,
    axum::Json(request): axum::Json<OptimizeRequest>,
) -> Response
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    let params = request.params.unwrap_or_default();
    match service.run_optimization(
        &request.hostel_id,
        &request.available_beds,
        &request.requests,
        params,
    ) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateRulesRequest {
    hostel_id: HostelId,
    context: RequestContext,
}

pub(crate) async fn evaluate_rules_handler<S, V>(
    State(service): State<Arc<AllocationService<S, V>>>,
    axum::Json(request): axum::Json<EvaluateRulesRequest>,
) -> Response
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    match service.evaluate_rules(&request.hostel_id, &request.context) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn availability_handler<S, V>(
    State(service): State<Arc<AllocationService<S, V>>>,
    Path(room_id): Path<String>,
) -> Response
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    match service.availability(&RoomId(room_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn alerts_handler<S, V>(
    State(service): State<Arc<AllocationService<S, V>>>,
    Path(room_id): Path<String>,
) -> Response
where
    S: AllocationStore + 'static,
    V: AvailabilityStore + 'static,
{
    match service.check_alerts(&RoomId(room_id)) {
        Ok(alerts) => (StatusCode::OK, axum::Json(alerts)).into_response(),
        Err(error) => error_response(error),
    }
}
