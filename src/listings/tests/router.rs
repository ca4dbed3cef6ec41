use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use super::common::*;
use crate::listings::memory::{MemoryListingRepository, MemoryPhotoStore};
use crate::listings::router::{listing_router, ListingWizard};

fn wizard_router() -> (Router, Arc<MemoryListingRepository>) {
    let repository = Arc::new(MemoryListingRepository::new());
    let photos = Arc::new(MemoryPhotoStore::new());
    let geo = Arc::new(StaticGeoGateway::new());
    let workflow = orchestrator(repository.clone(), photos, geo);
    let router = listing_router(Arc::new(ListingWizard::new(workflow)));
    (router, repository)
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", "user-1");

    match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json payload")
}

fn full_draft_patch() -> Value {
    let draft = publishable_draft();
    let photos: Vec<Value> = draft
        .photos
        .iter()
        .map(|photo| {
            json!({
                "preview": photo.preview,
                "bytes": BASE64.encode(&photo.bytes),
            })
        })
        .collect();

    json!({
        "title": draft.title,
        "description": draft.description,
        "bed_count": draft.bed_count,
        "bath_count": draft.bath_count,
        "price": draft.price,
        "address": { "label": draft.address.label, "description": draft.address.description },
        "start_date": draft.start_date,
        "end_date": draft.end_date,
        "photos": photos,
        "photo_labels": { "0": "Bedroom", "1": "Kitchen" },
        "phone": draft.phone,
    })
}

#[tokio::test]
async fn requests_without_a_user_are_unauthorized() {
    let (router, _) = wizard_router();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/listings/draft")
        .body(Body::empty())
        .expect("request builds");

    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn fresh_draft_is_empty_and_not_ready() {
    let (router, _) = wizard_router();

    let response = router
        .oneshot(request(Method::GET, "/api/v1/listings/draft", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["draft"]["title"], "");
    assert_eq!(body["draft"]["affiliation"], "rice");
    assert_eq!(body["ready_to_submit"], false);
    assert_eq!(body["sections"].as_array().expect("sections array").len(), 6);
}

#[tokio::test]
async fn patching_the_draft_updates_section_gates() {
    let (router, _) = wizard_router();

    let response = router
        .clone()
        .oneshot(request(
            Method::PATCH,
            "/api/v1/listings/draft",
            Some(json!({ "price": 950.0 })),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["draft"]["price"], 950.0);

    let pricing = body["sections"]
        .as_array()
        .expect("sections array")
        .iter()
        .find(|status| status["section"] == "pricing")
        .expect("pricing section present")
        .clone();
    assert_eq!(pricing["complete"], true);
    assert_eq!(body["ready_to_submit"], false);
}

#[tokio::test]
async fn reset_restores_the_default_draft() {
    let (router, _) = wizard_router();

    router
        .clone()
        .oneshot(request(
            Method::PATCH,
            "/api/v1/listings/draft",
            Some(json!({ "title": "Dryden House" })),
        ))
        .await
        .expect("patch response");

    let response = router
        .clone()
        .oneshot(request(Method::POST, "/api/v1/listings/draft/reset", None))
        .await
        .expect("reset response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(request(Method::GET, "/api/v1/listings/draft", None))
        .await
        .expect("read response");
    let body = json_body(response).await;
    assert_eq!(body["draft"]["title"], "");
}

#[tokio::test]
async fn submitting_an_incomplete_draft_returns_the_failing_sections() {
    let (router, repository) = wizard_router();

    let response = router
        .oneshot(request(Method::POST, "/api/v1/listings", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    let sections = body["sections"].as_array().expect("sections array");
    assert_eq!(sections.len(), 6, "an empty draft fails every gate");
    assert!(repository.listings().is_empty());
}

#[tokio::test]
async fn full_wizard_flow_publishes_a_listing() {
    let (router, repository) = wizard_router();

    let response = router
        .clone()
        .oneshot(request(
            Method::PATCH,
            "/api/v1/listings/draft",
            Some(full_draft_patch()),
        ))
        .await
        .expect("patch response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ready_to_submit"], true);

    let response = router
        .clone()
        .oneshot(request(Method::POST, "/api/v1/listings", None))
        .await
        .expect("submit response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let listing = json_body(response).await;
    assert_eq!(listing["title"], "Life Tower");
    assert_eq!(listing["distance_miles"], 3.0);
    assert_eq!(
        listing["image_paths"].as_array().expect("paths array").len(),
        5
    );

    assert_eq!(repository.listings().len(), 1);
    assert_eq!(repository.captions().len(), 2);

    let response = router
        .oneshot(request(Method::GET, "/api/v1/listings/draft", None))
        .await
        .expect("read response");
    let body = json_body(response).await;
    assert_eq!(body["draft"]["title"], "", "draft resets after publishing");
}

#[tokio::test]
async fn editing_someone_elses_listing_is_forbidden() {
    let (router, repository) = wizard_router();

    seed_listing_for(&repository, "user-2").await;
    let listing_id = repository.listings()[0].id.0.clone();

    let response = router
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/listings/{listing_id}/edit"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn archive_and_delete_round_trip() {
    let (router, repository) = wizard_router();

    seed_listing_for(&repository, "user-1").await;
    let listing_id = repository.listings()[0].id.0.clone();

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/listings/{listing_id}/archive"),
            None,
        ))
        .await
        .expect("archive response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(repository.listings()[0].archived);

    let response = router
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/listings/{listing_id}"),
            None,
        ))
        .await
        .expect("delete response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(repository.listings().is_empty());
}

async fn seed_listing_for(repository: &MemoryListingRepository, owner_id: &str) {
    use crate::listings::domain::UserId;
    use crate::listings::repository::{ListingRepository, NewListing};

    let draft = publishable_draft();
    repository
        .insert_listing(NewListing {
            owner: UserId(owner_id.to_string()),
            title: draft.title,
            description: draft.description,
            bed_count: draft.bed_count,
            bath_count: draft.bath_count,
            price: draft.price,
            price_notes: String::new(),
            address: draft.address.label,
            distance_miles: 3.0,
            start_date: draft.start_date,
            end_date: draft.end_date,
            duration_notes: String::new(),
            image_paths: vec!["seed/a.jpg".to_string()],
            phone: draft.phone,
            affiliation: draft.affiliation,
        })
        .await
        .expect("seed listing");
}
