use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use super::domain::{ListingDraft, ListingId, UserId};
use super::draft::{DraftPatch, DraftRegistry};
use super::geo::GeoGateway;
use super::repository::{ListingRepository, RepositoryError};
use super::sections::{ready_to_submit, section_statuses, SectionStatus, SubmitMode};
use super::storage::PhotoStore;
use super::submit::{CancelFlag, SubmissionOrchestrator, SubmitError};

/// Shared state for the wizard endpoints: one draft per authenticated user
/// plus the submission workflow.
pub struct ListingWizard<R, P, G> {
    drafts: DraftRegistry,
    orchestrator: SubmissionOrchestrator<R, P, G>,
}

impl<R, P, G> ListingWizard<R, P, G>
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    pub fn new(orchestrator: SubmissionOrchestrator<R, P, G>) -> Self {
        Self {
            drafts: DraftRegistry::new(),
            orchestrator,
        }
    }
}

/// Router builder exposing the listing wizard endpoints.
pub fn listing_router<R, P, G>(wizard: Arc<ListingWizard<R, P, G>>) -> Router
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings/draft",
            get(read_draft_handler::<R, P, G>).patch(update_draft_handler::<R, P, G>),
        )
        .route(
            "/api/v1/listings/draft/reset",
            post(reset_draft_handler::<R, P, G>),
        )
        .route("/api/v1/listings", post(submit_handler::<R, P, G>))
        .route(
            "/api/v1/listings/:listing_id/edit",
            get(edit_handler::<R, P, G>),
        )
        .route(
            "/api/v1/listings/:listing_id",
            put(save_edits_handler::<R, P, G>).delete(delete_handler::<R, P, G>),
        )
        .route(
            "/api/v1/listings/:listing_id/archive",
            post(archive_handler::<R, P, G>),
        )
        .with_state(wizard)
}

#[derive(Debug, Serialize)]
struct DraftView {
    draft: ListingDraft,
    sections: Vec<SectionStatus>,
    ready_to_submit: bool,
}

fn draft_view(draft: ListingDraft, mode: SubmitMode) -> DraftView {
    let sections = section_statuses(&draft, mode);
    let ready = ready_to_submit(&draft, mode);
    DraftView {
        draft,
        sections,
        ready_to_submit: ready,
    }
}

/// The auth gateway fronting this service injects the authenticated account
/// id; requests without it are unauthenticated.
fn current_user(headers: &HeaderMap) -> Result<UserId, Response> {
    match headers.get("x-user-id").and_then(|value| value.to_str().ok()) {
        Some(id) if !id.is_empty() => Ok(UserId(id.to_string())),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing authenticated user" })),
        )
            .into_response()),
    }
}

fn submit_error_response(error: SubmitError) -> Response {
    let status = match &error {
        SubmitError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitError::Upload { .. } | SubmitError::Geo(_) => StatusCode::BAD_GATEWAY,
        SubmitError::NotFound | SubmitError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        SubmitError::NotOwner => StatusCode::FORBIDDEN,
        SubmitError::Cancelled => StatusCode::BAD_REQUEST,
        SubmitError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        SubmitError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    let body = match &error {
        SubmitError::Validation { sections } => json!({
            "error": error.to_string(),
            "sections": sections.iter().map(|section| section.label()).collect::<Vec<_>>(),
        }),
        _ => json!({ "error": error.to_string() }),
    };

    (status, Json(body)).into_response()
}

async fn read_draft_handler<R, P, G>(
    State(wizard): State<Arc<ListingWizard<R, P, G>>>,
    headers: HeaderMap,
) -> Response
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let store = wizard.drafts.for_user(&user);
    (
        StatusCode::OK,
        Json(draft_view(store.read(), SubmitMode::Create)),
    )
        .into_response()
}

async fn update_draft_handler<R, P, G>(
    State(wizard): State<Arc<ListingWizard<R, P, G>>>,
    headers: HeaderMap,
    Json(patch): Json<DraftPatch>,
) -> Response
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let store = wizard.drafts.for_user(&user);
    store.update(patch);
    (
        StatusCode::OK,
        Json(draft_view(store.read(), SubmitMode::Create)),
    )
        .into_response()
}

async fn reset_draft_handler<R, P, G>(
    State(wizard): State<Arc<ListingWizard<R, P, G>>>,
    headers: HeaderMap,
) -> Response
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    wizard.drafts.for_user(&user).reset();
    StatusCode::NO_CONTENT.into_response()
}

async fn submit_handler<R, P, G>(
    State(wizard): State<Arc<ListingWizard<R, P, G>>>,
    headers: HeaderMap,
) -> Response
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let store = wizard.drafts.for_user(&user);
    match wizard
        .orchestrator
        .submit(&store, &user, &CancelFlag::new())
        .await
    {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(err) => submit_error_response(err),
    }
}

async fn edit_handler<R, P, G>(
    State(wizard): State<Arc<ListingWizard<R, P, G>>>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let store = wizard.drafts.for_user(&user);
    let id = ListingId(listing_id);
    match wizard.orchestrator.load_for_edit(&store, &id, &user).await {
        Ok(draft) => (StatusCode::OK, Json(draft_view(draft, SubmitMode::Edit))).into_response(),
        Err(err) => submit_error_response(err),
    }
}

async fn save_edits_handler<R, P, G>(
    State(wizard): State<Arc<ListingWizard<R, P, G>>>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let store = wizard.drafts.for_user(&user);
    let id = ListingId(listing_id);
    match wizard
        .orchestrator
        .save_edits(&store, &id, &user, &CancelFlag::new())
        .await
    {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => submit_error_response(err),
    }
}

async fn archive_handler<R, P, G>(
    State(wizard): State<Arc<ListingWizard<R, P, G>>>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let id = ListingId(listing_id);
    match wizard.orchestrator.archive(&id, &user).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => submit_error_response(err),
    }
}

async fn delete_handler<R, P, G>(
    State(wizard): State<Arc<ListingWizard<R, P, G>>>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let id = ListingId(listing_id);
    match wizard.orchestrator.delete(&id, &user).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => submit_error_response(err),
    }
}
