// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP request surface.
//!
//! Handlers translate wire DTOs into engine calls and back. They hold no
//! domain state; authorisation runs at the top of every handler through the
//! [`AuthGate`].

use crate::auth::{AuthError, AuthGate, TEST_ROLES_HEADER};
use crate::config::ServiceMode;
use crate::ws::serve_observe;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ft_core::{ErrorKind, JobId, JobStatus, Principal, Priority, TrainerKind};
use ft_engine::{EngineError, JobFilter, JobManager, ObserveFilter};
use ft_wire::{
    CancelResponse, ErrorBody, HealthResponse, JobDetail, JobSummary, ListJobsQuery,
    MetricsResponse, ObserveQuery, SubmitJobRequest, SubmitJobResponse,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Shared state behind every handler.
pub struct AppState {
    pub manager: JobManager,
    pub auth: AuthGate,
    pub mode: ServiceMode,
    pub started_at: Instant,
}

pub type SharedState = Arc<AppState>;

/// Build the service router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/metrics", get(metrics))
        .route("/api/jobs", post(submit).get(list))
        .route("/api/jobs/:id", get(get_job))
        .route("/api/jobs/:id/cancel", post(cancel))
        .route("/api/jobs/:id/dataset", get(dataset))
        .route("/api/observe", get(observe))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error envelope every handler returns on failure.
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { status: status_for(kind), body: ErrorBody::new(kind, message) }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidConfig | ErrorKind::UnknownTrainer => StatusCode::BAD_REQUEST,
        ErrorKind::Capacity => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Terminal => StatusCode::CONFLICT,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::AuthInsufficient => StatusCode::FORBIDDEN,
        ErrorKind::CancelTimeout
        | ErrorKind::Timeout
        | ErrorKind::SlowConsumer
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::new(e.kind(), e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::new(e.kind(), e.to_string())
    }
}

/// Resolve and authenticate the caller.
pub(crate) fn principal(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let test_roles = headers.get(TEST_ROLES_HEADER).and_then(|v| v.to_str().ok());
    Ok(state.auth.authenticate(bearer, test_roles)?)
}

fn require_read(principal: &Principal) -> Result<(), ApiError> {
    if principal.can_read() {
        Ok(())
    } else {
        Err(ApiError::new(ErrorKind::AuthInsufficient, "read access requires a role"))
    }
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let metrics = state.manager.metrics();
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.mode.to_string(),
        uptime_ms: state.started_at.elapsed().as_millis() as u64,
        workers: metrics.workers_total,
        queue_depth: metrics.queue_depth,
    })
}

async fn metrics(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<MetricsResponse>, ApiError> {
    let caller = principal(&state, &headers)?;
    require_read(&caller)?;
    Ok(Json(MetricsResponse { snapshot: state.manager.metrics() }))
}

async fn submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    let caller = principal(&state, &headers)?;

    let Some(kind) = TrainerKind::parse(&request.trainer_kind) else {
        return Err(ApiError::new(
            ErrorKind::UnknownTrainer,
            format!("unknown trainer kind '{}'", request.trainer_kind),
        ));
    };
    if !caller.can_submit(kind) {
        return Err(ApiError::new(
            ErrorKind::AuthInsufficient,
            format!("submitting {} jobs requires the matching role", kind),
        ));
    }

    let priority = match request.priority {
        Some(value) => Priority::new(value).ok_or_else(|| {
            ApiError::new(ErrorKind::InvalidConfig, format!("priority out of range: {}", value))
        })?,
        None => Priority::default(),
    };

    let mut spec = ft_core::JobSpec::new(kind, request.config_ref)
        .priority(priority)
        .submitted_by(caller.id);
    if let Some(dataset_ref) = request.dataset_ref {
        spec = spec.dataset_ref(dataset_ref);
    }
    for tag in request.tags {
        spec = spec.tag(tag);
    }

    let job_id = state.manager.submit(spec).await?;
    debug!(job = %job_id, "submit accepted");
    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id: job_id.to_string() })))
}

async fn list(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobSummary>>, ApiError> {
    let caller = principal(&state, &headers)?;
    require_read(&caller)?;

    let filter = filter_from_query(&query)?;
    let jobs = state.manager.list(&filter);
    Ok(Json(jobs.iter().map(JobSummary::from).collect()))
}

fn filter_from_query(query: &ListJobsQuery) -> Result<JobFilter, ApiError> {
    let statuses = match &query.status {
        Some(raw) => {
            let mut set = BTreeSet::new();
            for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let status = JobStatus::parse(tag).ok_or_else(|| {
                    ApiError::new(ErrorKind::InvalidConfig, format!("unknown status '{}'", tag))
                })?;
                set.insert(status);
            }
            Some(set)
        }
        None => None,
    };
    let kinds = match &query.kind {
        Some(raw) => {
            let mut set = BTreeSet::new();
            for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let kind = TrainerKind::parse(tag).ok_or_else(|| {
                    ApiError::new(ErrorKind::InvalidConfig, format!("unknown kind '{}'", tag))
                })?;
                set.insert(kind);
            }
            Some(set)
        }
        None => None,
    };
    Ok(JobFilter {
        statuses,
        kinds,
        submitted_by: query.submitted_by.clone(),
        limit: query.limit,
    })
}

async fn get_job(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<JobDetail>, ApiError> {
    let caller = principal(&state, &headers)?;
    require_read(&caller)?;

    let job = state.manager.get(&JobId::from_string(&id))?;
    Ok(Json(JobDetail::from(&job)))
}

async fn cancel(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let caller = principal(&state, &headers)?;

    let job_id = JobId::from_string(&id);
    let job = state.manager.get(&job_id)?;
    if !caller.can_cancel(&job.submitted_by, job.kind) {
        return Err(ApiError::new(
            ErrorKind::AuthInsufficient,
            "cancel requires ownership or admin, plus the job's kind role",
        ));
    }

    state.manager.cancel(&job_id)?;
    let job = state.manager.get(&job_id)?;
    Ok(Json(CancelResponse { job_id: job_id.to_string(), status: job.status.to_string() }))
}

async fn dataset(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ft_core::DatasetDescriptor>, ApiError> {
    let caller = principal(&state, &headers)?;
    require_read(&caller)?;

    let job = state.manager.get(&JobId::from_string(&id))?;
    match (job.status, job.dataset) {
        (JobStatus::Completed, Some(descriptor)) => Ok(Json(descriptor)),
        _ => Err(ApiError::new(
            ErrorKind::NotFound,
            "no dataset descriptor for this job",
        )),
    }
}

async fn observe(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<ObserveQuery>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let caller = principal(&state, &headers)?;
    require_read(&caller)?;

    let filter = match query.filter.as_deref() {
        None | Some("*") | Some("") => ObserveFilter::All,
        Some(id) => ObserveFilter::Job(JobId::from_string(id)),
    };
    let subscription = state.manager.observe(filter)?;

    Ok(upgrade.on_upgrade(move |socket| serve_observe(socket, subscription)))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
