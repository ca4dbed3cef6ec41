use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::domain::{Listing, ListingId, PhotoCaption};
use super::repository::{ListingPatch, ListingRepository, NewListing, RepositoryError};
use super::storage::{PhotoStore, PhotoStoreError};

/// In-process listing rows, used by the dev server mode and the test-suite.
#[derive(Default)]
pub struct MemoryListingRepository {
    listings: Mutex<HashMap<ListingId, Listing>>,
    captions: Mutex<Vec<PhotoCaption>>,
}

impl MemoryListingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listings(&self) -> Vec<Listing> {
        self.listings
            .lock()
            .expect("listing mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn captions(&self) -> Vec<PhotoCaption> {
        self.captions.lock().expect("caption mutex poisoned").clone()
    }
}

#[async_trait]
impl ListingRepository for MemoryListingRepository {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, RepositoryError> {
        let stored = Listing {
            id: ListingId(Uuid::new_v4().to_string()),
            owner: listing.owner,
            title: listing.title,
            description: listing.description,
            bed_count: listing.bed_count,
            bath_count: listing.bath_count,
            price: listing.price,
            price_notes: listing.price_notes,
            address: listing.address,
            distance_miles: listing.distance_miles,
            start_date: listing.start_date,
            end_date: listing.end_date,
            duration_notes: listing.duration_notes,
            image_paths: listing.image_paths,
            phone: listing.phone,
            affiliation: listing.affiliation,
            archived: false,
            created_at: Utc::now(),
        };

        self.listings
            .lock()
            .expect("listing mutex poisoned")
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_listing(
        &self,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.listings.lock().expect("listing mutex poisoned");
        let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;

        listing.title = patch.title;
        listing.description = patch.description;
        listing.bed_count = patch.bed_count;
        listing.bath_count = patch.bath_count;
        listing.price = patch.price;
        listing.price_notes = patch.price_notes;
        listing.address = patch.address;
        listing.start_date = patch.start_date;
        listing.end_date = patch.end_date;
        listing.duration_notes = patch.duration_notes;
        listing.image_paths = patch.image_paths;
        listing.phone = patch.phone;
        listing.affiliation = patch.affiliation;
        Ok(())
    }

    async fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let guard = self.listings.lock().expect("listing mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn set_archived(&self, id: &ListingId, archived: bool) -> Result<(), RepositoryError> {
        let mut guard = self.listings.lock().expect("listing mutex poisoned");
        let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        listing.archived = archived;
        Ok(())
    }

    async fn delete_listing(&self, id: &ListingId) -> Result<(), RepositoryError> {
        let mut guard = self.listings.lock().expect("listing mutex poisoned");
        guard.remove(id).ok_or(RepositoryError::NotFound)?;
        Ok(())
    }

    async fn insert_captions(&self, captions: Vec<PhotoCaption>) -> Result<(), RepositoryError> {
        self.captions
            .lock()
            .expect("caption mutex poisoned")
            .extend(captions);
        Ok(())
    }

    async fn delete_captions(&self, image_paths: &[String]) -> Result<(), RepositoryError> {
        self.captions
            .lock()
            .expect("caption mutex poisoned")
            .retain(|caption| !image_paths.contains(&caption.image_path));
        Ok(())
    }

    async fn captions_for(
        &self,
        image_paths: &[String],
    ) -> Result<Vec<PhotoCaption>, RepositoryError> {
        let guard = self.captions.lock().expect("caption mutex poisoned");
        Ok(guard
            .iter()
            .filter(|caption| image_paths.contains(&caption.image_path))
            .cloned()
            .collect())
    }
}

/// In-process object store keyed by path.
#[derive(Default)]
pub struct MemoryPhotoStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .expect("object mutex poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("object mutex poisoned")
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String, PhotoStoreError> {
        self.objects
            .lock()
            .expect("object mutex poisoned")
            .insert(key.to_string(), bytes);
        Ok(key.to_string())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), PhotoStoreError> {
        let mut guard = self.objects.lock().expect("object mutex poisoned");
        for key in keys {
            guard.remove(key);
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://listing-photos/{key}")
    }
}
