use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::listings::domain::{
    Affiliation, DraftAddress, Listing, ListingDraft, ListingId, PhotoAttachment, PhotoCaption,
    UserId,
};
use crate::listings::geo::{Coordinates, GeoError, GeoGateway, RouteSummary};
use crate::listings::memory::{MemoryListingRepository, MemoryPhotoStore};
use crate::listings::repository::{ListingPatch, ListingRepository, NewListing, RepositoryError};
use crate::listings::storage::{PhotoStore, PhotoStoreError};
use crate::listings::submit::SubmissionOrchestrator;

pub(super) const CAMPUS: Coordinates = Coordinates {
    lat: 29.7174,
    lon: -95.4018,
};

pub(super) fn owner() -> UserId {
    UserId("user-1".to_string())
}

pub(super) fn photo(name: &str) -> PhotoAttachment {
    PhotoAttachment {
        preview: format!("blob:{name}"),
        bytes: name.as_bytes().to_vec(),
    }
}

/// A draft that passes every create-mode section check.
pub(super) fn publishable_draft() -> ListingDraft {
    ListingDraft {
        title: "Life Tower".to_string(),
        description: "Sunny one-bedroom sublease a short bike ride from campus, \
                      fully furnished with in-unit laundry, a dedicated desk, and \
                      garage parking included in rent."
            .to_string(),
        bed_count: 2,
        bath_count: 2,
        price: 1050.0,
        address: DraftAddress {
            label: "909 Texas Ave, Houston, TX".to_string(),
            description: "Downtown".to_string(),
        },
        start_date: "2026-06-01T00:00:00Z".to_string(),
        end_date: "2026-08-15T00:00:00Z".to_string(),
        photos: (0..5).map(|index| photo(&format!("photo-{index}"))).collect(),
        photo_labels: [(0, "Bedroom".to_string()), (1, "Kitchen".to_string())]
            .into_iter()
            .collect(),
        phone: "7135550123".to_string(),
        ..ListingDraft::default()
    }
}

pub(super) fn stored_listing(owner: &UserId, image_paths: Vec<String>) -> Listing {
    Listing {
        id: ListingId("listing-1".to_string()),
        owner: owner.clone(),
        title: "Life Tower".to_string(),
        description: publishable_draft().description,
        bed_count: 2,
        bath_count: 2,
        price: 1050.0,
        price_notes: String::new(),
        address: "909 Texas Ave, Houston, TX".to_string(),
        distance_miles: 3.0,
        start_date: "2026-06-01T00:00:00Z".to_string(),
        end_date: "2026-08-15T00:00:00Z".to_string(),
        duration_notes: String::new(),
        image_paths,
        phone: "7135550123".to_string(),
        affiliation: Affiliation::Rice,
        archived: false,
        created_at: Utc::now(),
    }
}

pub(super) fn orchestrator<R, P, G>(
    repository: Arc<R>,
    photos: Arc<P>,
    geo: Arc<G>,
) -> SubmissionOrchestrator<R, P, G>
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    SubmissionOrchestrator::new(repository, photos, geo, CAMPUS)
}

/// Geo gateway answering from fixed data; records how often it was asked.
pub(super) struct StaticGeoGateway {
    candidates: Vec<Coordinates>,
    distance_meters: f64,
    pub(super) geocode_calls: AtomicUsize,
}

impl StaticGeoGateway {
    pub(super) fn new() -> Self {
        Self {
            candidates: vec![Coordinates {
                lat: 29.7604,
                lon: -95.3698,
            }],
            distance_meters: 4827.0,
            geocode_calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn without_candidates() -> Self {
        Self {
            candidates: Vec::new(),
            ..Self::new()
        }
    }
}

#[async_trait]
impl GeoGateway for StaticGeoGateway {
    async fn geocode(&self, _query: &str) -> Result<Vec<Coordinates>, GeoError> {
        self.geocode_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.candidates.clone())
    }

    async fn driving_route(
        &self,
        _from: Coordinates,
        _to: Coordinates,
    ) -> Result<RouteSummary, GeoError> {
        Ok(RouteSummary {
            distance_meters: self.distance_meters,
            duration_seconds: 612.0,
        })
    }
}

/// Photo store that rejects the first `count` uploads to arrive and records
/// every removal.
pub(super) struct FlakyPhotoStore {
    pub(super) inner: MemoryPhotoStore,
    remaining_failures: AtomicUsize,
    pub(super) removed: Mutex<Vec<String>>,
}

impl FlakyPhotoStore {
    pub(super) fn failing(count: usize) -> Self {
        Self {
            inner: MemoryPhotoStore::new(),
            remaining_failures: AtomicUsize::new(count),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn removed_keys(&self) -> Vec<String> {
        self.removed.lock().expect("removed mutex poisoned").clone()
    }
}

#[async_trait]
impl PhotoStore for FlakyPhotoStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String, PhotoStoreError> {
        let claimed_failure = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if claimed_failure {
            return Err(PhotoStoreError::Rejected("simulated outage".to_string()));
        }

        self.inner.upload(key, bytes).await
    }

    async fn remove(&self, keys: &[String]) -> Result<(), PhotoStoreError> {
        self.removed
            .lock()
            .expect("removed mutex poisoned")
            .extend(keys.iter().cloned());
        self.inner.remove(keys).await
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }
}

/// Photo store that finishes earlier uploads later, to prove results are
/// joined in submission order rather than completion order.
pub(super) struct SlowPhotoStore {
    pub(super) inner: MemoryPhotoStore,
    arrivals: AtomicUsize,
    pub(super) completion_order: Mutex<Vec<String>>,
}

impl SlowPhotoStore {
    pub(super) fn new() -> Self {
        Self {
            inner: MemoryPhotoStore::new(),
            arrivals: AtomicUsize::new(0),
            completion_order: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn completions(&self) -> Vec<String> {
        self.completion_order
            .lock()
            .expect("order mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl PhotoStore for SlowPhotoStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String, PhotoStoreError> {
        let arrival = self.arrivals.fetch_add(1, Ordering::SeqCst);
        let delay = 100u64.saturating_sub(arrival as u64 * 20);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let path = self.inner.upload(key, bytes).await?;
        self.completion_order
            .lock()
            .expect("order mutex poisoned")
            .push(path.clone());
        Ok(path)
    }

    async fn remove(&self, keys: &[String]) -> Result<(), PhotoStoreError> {
        self.inner.remove(keys).await
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }
}

/// Repository whose listing insert always fails; everything else delegates
/// to the in-memory implementation.
pub(super) struct InsertFailingRepository {
    pub(super) inner: MemoryListingRepository,
}

impl InsertFailingRepository {
    pub(super) fn new() -> Self {
        Self {
            inner: MemoryListingRepository::new(),
        }
    }
}

#[async_trait]
impl ListingRepository for InsertFailingRepository {
    async fn insert_listing(&self, _listing: NewListing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn update_listing(
        &self,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<(), RepositoryError> {
        self.inner.update_listing(id, patch).await
    }

    async fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch_listing(id).await
    }

    async fn set_archived(&self, id: &ListingId, archived: bool) -> Result<(), RepositoryError> {
        self.inner.set_archived(id, archived).await
    }

    async fn delete_listing(&self, id: &ListingId) -> Result<(), RepositoryError> {
        self.inner.delete_listing(id).await
    }

    async fn insert_captions(&self, captions: Vec<PhotoCaption>) -> Result<(), RepositoryError> {
        self.inner.insert_captions(captions).await
    }

    async fn delete_captions(&self, image_paths: &[String]) -> Result<(), RepositoryError> {
        self.inner.delete_captions(image_paths).await
    }

    async fn captions_for(
        &self,
        image_paths: &[String],
    ) -> Result<Vec<PhotoCaption>, RepositoryError> {
        self.inner.captions_for(image_paths).await
    }
}

/// Repository whose caption insert always fails; everything else delegates
/// to the in-memory implementation.
pub(super) struct CaptionFailingRepository {
    pub(super) inner: MemoryListingRepository,
}

impl CaptionFailingRepository {
    pub(super) fn new() -> Self {
        Self {
            inner: MemoryListingRepository::new(),
        }
    }
}

#[async_trait]
impl ListingRepository for CaptionFailingRepository {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, RepositoryError> {
        self.inner.insert_listing(listing).await
    }

    async fn update_listing(
        &self,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<(), RepositoryError> {
        self.inner.update_listing(id, patch).await
    }

    async fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch_listing(id).await
    }

    async fn set_archived(&self, id: &ListingId, archived: bool) -> Result<(), RepositoryError> {
        self.inner.set_archived(id, archived).await
    }

    async fn delete_listing(&self, id: &ListingId) -> Result<(), RepositoryError> {
        self.inner.delete_listing(id).await
    }

    async fn insert_captions(&self, _captions: Vec<PhotoCaption>) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable(
            "caption table offline".to_string(),
        ))
    }

    async fn delete_captions(&self, image_paths: &[String]) -> Result<(), RepositoryError> {
        self.inner.delete_captions(image_paths).await
    }

    async fn captions_for(
        &self,
        image_paths: &[String],
    ) -> Result<Vec<PhotoCaption>, RepositoryError> {
        self.inner.captions_for(image_paths).await
    }
}
