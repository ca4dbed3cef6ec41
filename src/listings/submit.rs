use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{
    Listing, ListingDraft, ListingId, PhotoCaption, UserId, EXISTING_PHOTO_SLOT_BASE,
};
use super::draft::{draft_from_listing, DraftStore};
use super::geo::{meters_to_miles, Coordinates, GeoError, GeoGateway};
use super::repository::{ListingPatch, ListingRepository, NewListing, RepositoryError};
use super::sections::{incomplete_sections, Section, SubmitMode};
use super::storage::PhotoStore;

/// Cooperative cancellation flag checked between submission stages, so a
/// user navigating away mid-submit gets defined behavior instead of an
/// orphaned in-flight task.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Error raised by the submission workflow.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("only {uploaded} of {requested} photo uploads succeeded")]
    Upload { requested: usize, uploaded: usize },
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error("sections incomplete: {sections:?}")]
    Validation { sections: Vec<Section> },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("listing not found")]
    NotFound,
    #[error("listing belongs to another user")]
    NotOwner,
    #[error("submission cancelled before completion")]
    Cancelled,
}

/// Runs the multi-resource create/edit transaction: photo uploads, the
/// campus distance measurement, row and caption persistence, and the
/// best-effort cleanup that stands in for cross-service atomicity.
pub struct SubmissionOrchestrator<R, P, G> {
    repository: Arc<R>,
    photos: Arc<P>,
    geo: Arc<G>,
    campus: Coordinates,
}

impl<R, P, G> SubmissionOrchestrator<R, P, G>
where
    R: ListingRepository + 'static,
    P: PhotoStore + 'static,
    G: GeoGateway + 'static,
{
    pub fn new(repository: Arc<R>, photos: Arc<P>, geo: Arc<G>, campus: Coordinates) -> Self {
        Self {
            repository,
            photos,
            geo,
            campus,
        }
    }

    /// Publish the draft as a new listing. On success the draft is reset;
    /// on any failure it is left intact so the user can retry.
    pub async fn submit(
        &self,
        store: &DraftStore,
        owner: &UserId,
        cancel: &CancelFlag,
    ) -> Result<Listing, SubmitError> {
        let draft = store.read();

        let uploaded = self.upload_photos(&draft, owner).await?;

        if cancel.is_cancelled() {
            self.compensate(&uploaded).await;
            return Err(SubmitError::Cancelled);
        }

        let distance_miles = match self.distance_from_campus(&draft.address.label).await {
            Ok(miles) => miles,
            Err(err) => {
                self.compensate(&uploaded).await;
                return Err(err.into());
            }
        };

        // Defensive re-check, independent of the wizard's own gating.
        let missing = incomplete_sections(&draft, SubmitMode::Create);
        if !missing.is_empty() {
            return Err(SubmitError::Validation { sections: missing });
        }

        if cancel.is_cancelled() {
            self.compensate(&uploaded).await;
            return Err(SubmitError::Cancelled);
        }

        let row = NewListing {
            owner: owner.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            bed_count: draft.bed_count,
            bath_count: draft.bath_count,
            price: draft.price,
            price_notes: draft.price_notes.clone(),
            address: draft.address.label.clone(),
            distance_miles,
            start_date: draft.start_date.clone(),
            end_date: draft.end_date.clone(),
            duration_notes: draft.duration_notes.clone(),
            image_paths: uploaded.clone(),
            phone: draft.phone.clone(),
            affiliation: draft.affiliation,
        };

        let stored = match self.repository.insert_listing(row).await {
            Ok(listing) => listing,
            Err(err) => {
                self.compensate(&uploaded).await;
                return Err(err.into());
            }
        };

        let captions = new_photo_captions(&draft, &uploaded, owner);
        if !captions.is_empty() {
            if let Err(err) = self.repository.insert_captions(captions).await {
                self.compensate(&uploaded).await;
                return Err(err.into());
            }
        }

        store.reset();
        info!(listing_id = %stored.id.0, photos = uploaded.len(), "listing published");
        Ok(stored)
    }

    /// Hydrate the draft store from a stored listing for the edit flow.
    /// Only the owner may open the editor.
    pub async fn load_for_edit(
        &self,
        store: &DraftStore,
        listing_id: &ListingId,
        user: &UserId,
    ) -> Result<ListingDraft, SubmitError> {
        let listing = self
            .repository
            .fetch_listing(listing_id)
            .await?
            .ok_or(SubmitError::NotFound)?;
        if listing.owner != *user {
            return Err(SubmitError::NotOwner);
        }

        let captions = self.repository.captions_for(&listing.image_paths).await?;
        let draft = draft_from_listing(&listing, &captions);
        store.replace(draft.clone());
        Ok(draft)
    }

    /// Persist the edit-flow draft back onto an existing listing. The stored
    /// distance is carried over unchanged; edits never re-measure it.
    pub async fn save_edits(
        &self,
        store: &DraftStore,
        listing_id: &ListingId,
        owner: &UserId,
        cancel: &CancelFlag,
    ) -> Result<Listing, SubmitError> {
        let draft = store.read();

        let existing = self
            .repository
            .fetch_listing(listing_id)
            .await?
            .ok_or(SubmitError::NotFound)?;
        if existing.owner != *owner {
            return Err(SubmitError::NotOwner);
        }

        let missing = incomplete_sections(&draft, SubmitMode::Edit);
        if !missing.is_empty() {
            return Err(SubmitError::Validation { sections: missing });
        }

        let uploaded = self.upload_photos(&draft, owner).await?;

        if cancel.is_cancelled() {
            self.compensate(&uploaded).await;
            return Err(SubmitError::Cancelled);
        }

        // Captions for retained and removed photos are replaced wholesale
        // from the current labels.
        let mut replaced_scope = draft.image_paths.clone();
        replaced_scope.extend(draft.removed_image_paths.iter().cloned());
        if let Err(err) = self.repository.delete_captions(&replaced_scope).await {
            self.compensate(&uploaded).await;
            return Err(err.into());
        }

        let mut image_paths = draft.image_paths.clone();
        image_paths.extend(uploaded.iter().cloned());

        let patch = ListingPatch {
            title: draft.title.clone(),
            description: draft.description.clone(),
            bed_count: draft.bed_count,
            bath_count: draft.bath_count,
            price: draft.price,
            price_notes: draft.price_notes.clone(),
            address: draft.address.label.clone(),
            start_date: draft.start_date.clone(),
            end_date: draft.end_date.clone(),
            duration_notes: draft.duration_notes.clone(),
            image_paths,
            phone: draft.phone.clone(),
            affiliation: draft.affiliation,
        };

        if let Err(err) = self.repository.update_listing(listing_id, patch).await {
            self.compensate(&uploaded).await;
            return Err(err.into());
        }

        let captions = edited_photo_captions(&draft, &uploaded, owner);
        if !captions.is_empty() {
            if let Err(err) = self.repository.insert_captions(captions).await {
                self.compensate(&uploaded).await;
                return Err(err.into());
            }
        }

        // Removed photos leave storage only once the row update has landed.
        if !draft.removed_image_paths.is_empty() {
            if let Err(err) = self.photos.remove(&draft.removed_image_paths).await {
                warn!(%err, "failed to delete removed photos after edit save");
            }
        }

        store.reset();

        self.repository
            .fetch_listing(listing_id)
            .await?
            .ok_or(SubmitError::NotFound)
    }

    /// Soft-delete: the row stays but is flagged archived.
    pub async fn archive(&self, listing_id: &ListingId, user: &UserId) -> Result<(), SubmitError> {
        let listing = self
            .repository
            .fetch_listing(listing_id)
            .await?
            .ok_or(SubmitError::NotFound)?;
        if listing.owner != *user {
            return Err(SubmitError::NotOwner);
        }

        self.repository.set_archived(listing_id, true).await?;
        Ok(())
    }

    /// Hard-delete the listing row, then clean up its captions and photos.
    pub async fn delete(&self, listing_id: &ListingId, user: &UserId) -> Result<(), SubmitError> {
        let listing = self
            .repository
            .fetch_listing(listing_id)
            .await?
            .ok_or(SubmitError::NotFound)?;
        if listing.owner != *user {
            return Err(SubmitError::NotOwner);
        }

        self.repository.delete_listing(listing_id).await?;

        if let Err(err) = self.repository.delete_captions(&listing.image_paths).await {
            warn!(%err, "caption cleanup failed after listing delete");
        }
        if let Err(err) = self.photos.remove(&listing.image_paths).await {
            warn!(%err, "photo cleanup failed after listing delete");
        }
        Ok(())
    }

    /// Upload every new photo concurrently, joining results in submission
    /// order so `result[i]` holds the storage key for `draft.photos[i]`.
    /// Joining by completion order instead would mis-attribute captions.
    async fn upload_photos(
        &self,
        draft: &ListingDraft,
        owner: &UserId,
    ) -> Result<Vec<String>, SubmitError> {
        let requested = draft.photos.len();
        let mut handles = Vec::with_capacity(requested);

        for photo in &draft.photos {
            let store = Arc::clone(&self.photos);
            let key = photo_key(owner);
            let bytes = photo.bytes.clone();
            handles.push(tokio::spawn(async move { store.upload(&key, bytes).await }));
        }

        let mut paths = Vec::with_capacity(requested);
        for handle in handles {
            match handle.await {
                Ok(Ok(path)) => paths.push(path),
                Ok(Err(err)) => warn!(%err, "photo upload failed"),
                Err(err) => warn!(%err, "photo upload task aborted"),
            }
        }

        if paths.len() != requested {
            return Err(SubmitError::Upload {
                requested,
                uploaded: paths.len(),
            });
        }

        Ok(paths)
    }

    async fn distance_from_campus(&self, address: &str) -> Result<f64, GeoError> {
        let candidates = self.geo.geocode(address).await?;
        let destination = candidates
            .first()
            .copied()
            .ok_or_else(|| GeoError::NoMatch(address.to_string()))?;
        let route = self.geo.driving_route(self.campus, destination).await?;
        Ok(meters_to_miles(route.distance_meters))
    }

    /// Best-effort cleanup of side effects already written for `uploaded`.
    /// Failures here are logged; the stage error that triggered cleanup is
    /// the one the caller sees.
    async fn compensate(&self, uploaded: &[String]) {
        if uploaded.is_empty() {
            return;
        }

        if let Err(err) = self.repository.delete_captions(uploaded).await {
            warn!(%err, "caption cleanup failed after aborted submission");
        }
        if let Err(err) = self.photos.remove(uploaded).await {
            warn!(%err, "photo cleanup failed after aborted submission");
        }
    }
}

fn photo_key(owner: &UserId) -> String {
    format!("{}/{}", owner.0, Uuid::new_v4())
}

/// Caption rows for newly uploaded photos: slots 0..N-1 map to the uploaded
/// keys by index; blank labels are skipped.
fn new_photo_captions(
    draft: &ListingDraft,
    uploaded: &[String],
    owner: &UserId,
) -> Vec<PhotoCaption> {
    uploaded
        .iter()
        .enumerate()
        .filter_map(|(index, path)| {
            let label = draft.photo_labels.get(&(index as u32))?;
            if label.trim().is_empty() {
                return None;
            }
            Some(PhotoCaption {
                image_path: path.clone(),
                caption: label.clone(),
                owner: owner.clone(),
            })
        })
        .collect()
}

/// Caption rows for an edit save: slots below the existing-photo base map
/// onto this save's uploads, slots at or above it map back onto retained
/// photos by position.
fn edited_photo_captions(
    draft: &ListingDraft,
    uploaded: &[String],
    owner: &UserId,
) -> Vec<PhotoCaption> {
    let mut captions = Vec::new();
    for (slot, label) in &draft.photo_labels {
        if label.trim().is_empty() {
            continue;
        }

        let path = if *slot < EXISTING_PHOTO_SLOT_BASE {
            uploaded.get(*slot as usize)
        } else {
            draft
                .image_paths
                .get((slot - EXISTING_PHOTO_SLOT_BASE) as usize)
        };

        if let Some(path) = path {
            captions.push(PhotoCaption {
                image_path: path.clone(),
                caption: label.clone(),
                owner: owner.clone(),
            });
        }
    }
    captions
}
