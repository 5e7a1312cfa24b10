use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Extension, Json, Router};
use jobboard::marketplace::{
    AccountDeletion, Application, ApplicationId, ApplicationStatus, EmployerId, EmployerProfile,
    JobPosting, PostingApplicationSummary, PostingId, ReconcileReport, Role,
    SeekerApplicationSummary, UserId,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::infra::{ApiError, AppState, Caller, Market};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApplyRequest {
    pub(crate) job_posting: PostingId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    pub(crate) status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostingRequest {
    pub(crate) title: String,
}

pub(crate) fn with_marketplace_routes(market: Arc<Market>) -> Router {
    marketplace_router(market)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) fn marketplace_router(market: Arc<Market>) -> Router {
    Router::new()
        .route(
            "/job-seeker/applications",
            post(submit_application).get(seeker_applications),
        )
        .route("/employer/job-postings", post(publish_posting))
        .route(
            "/employer/job-postings/:posting_id/applications",
            get(posting_applications),
        )
        .route(
            "/employer/applications/:application_id",
            patch(update_application_status),
        )
        .route("/employer/profile", get(employer_profile))
        .route("/employer/:user_id", delete(delete_account))
        .route("/employers", get(list_employers))
        .route("/employers/:employer_id", get(employer_by_id))
        .route("/admin/reconcile", post(reconcile))
        .with_state(market)
}

pub(crate) async fn submit_application(
    State(market): State<Arc<Market>>,
    caller: Caller,
    Json(request): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    let principal = caller.require(Role::Seeker)?;
    let application = market
        .applications
        .submit_application(&principal.id, &request.job_posting)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub(crate) async fn seeker_applications(
    State(market): State<Arc<Market>>,
    caller: Caller,
) -> Result<Json<Vec<SeekerApplicationSummary>>, ApiError> {
    let principal = caller.require(Role::Seeker)?;
    let listing = market
        .applications
        .applications_for_seeker(&principal.id)
        .await?;
    Ok(Json(listing))
}

pub(crate) async fn posting_applications(
    State(market): State<Arc<Market>>,
    caller: Caller,
    Path(posting_id): Path<Uuid>,
) -> Result<Json<Vec<PostingApplicationSummary>>, ApiError> {
    let principal = caller.require(Role::Employer)?;
    let listing = market
        .applications
        .applications_for_posting(&principal.id, &PostingId::from(posting_id))
        .await?;
    Ok(Json(listing))
}

pub(crate) async fn update_application_status(
    State(market): State<Arc<Market>>,
    caller: Caller,
    Path(application_id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Application>, ApiError> {
    let principal = caller.require(Role::Employer)?;
    let application = market
        .applications
        .transition_status(
            &principal.id,
            &ApplicationId::from(application_id),
            request.status,
        )
        .await?;
    Ok(Json(application))
}

pub(crate) async fn publish_posting(
    State(market): State<Arc<Market>>,
    caller: Caller,
    Json(request): Json<PostingRequest>,
) -> Result<(StatusCode, Json<JobPosting>), ApiError> {
    let principal = caller.require(Role::Employer)?;
    let posting = market
        .employers
        .publish_posting(&principal.id, &request.title)
        .await?;
    Ok((StatusCode::CREATED, Json(posting)))
}

pub(crate) async fn employer_profile(
    State(market): State<Arc<Market>>,
    caller: Caller,
) -> Result<Json<EmployerProfile>, ApiError> {
    let principal = caller.require(Role::Employer)?;
    Ok(Json(market.employers.profile(&principal.id).await?))
}

pub(crate) async fn list_employers(
    State(market): State<Arc<Market>>,
    _caller: Caller,
) -> Result<Json<Vec<EmployerProfile>>, ApiError> {
    Ok(Json(market.employers.employers().await?))
}

pub(crate) async fn employer_by_id(
    State(market): State<Arc<Market>>,
    _caller: Caller,
    Path(employer_id): Path<Uuid>,
) -> Result<Json<EmployerProfile>, ApiError> {
    let profile = market
        .employers
        .employer(&EmployerId::from(employer_id))
        .await?;
    Ok(Json(profile))
}

pub(crate) async fn delete_account(
    State(market): State<Arc<Market>>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<AccountDeletion>, ApiError> {
    let principal = caller.require(Role::Employer)?;
    let deletion = market
        .employers
        .delete_account(&principal, &UserId::from(user_id))
        .await?;
    Ok(Json(deletion))
}

pub(crate) async fn reconcile(
    State(market): State<Arc<Market>>,
    caller: Caller,
) -> Result<Json<ReconcileReport>, ApiError> {
    caller.require(Role::Admin)?;
    Ok(Json(market.reconciler.reconcile().await?))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
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
