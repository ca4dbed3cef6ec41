use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Affiliation, Listing, ListingId, PhotoCaption, UserId};

/// Fields for a brand-new listing row; the store assigns the id and the
/// creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub bed_count: u32,
    pub bath_count: u32,
    pub price: f64,
    pub price_notes: String,
    pub address: String,
    pub distance_miles: f64,
    pub start_date: String,
    pub end_date: String,
    pub duration_notes: String,
    pub image_paths: Vec<String>,
    pub phone: String,
    pub affiliation: Affiliation,
}

/// Column updates applied when the owner saves the edit flow. The stored
/// distance is carried over unchanged; edits never re-measure it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPatch {
    pub title: String,
    pub description: String,
    pub bed_count: u32,
    pub bath_count: u32,
    pub price: f64,
    pub price_notes: String,
    pub address: String,
    pub start_date: String,
    pub end_date: String,
    pub duration_notes: String,
    pub image_paths: Vec<String>,
    pub phone: String,
    pub affiliation: Affiliation,
}

/// Storage abstraction over the managed relational store so the submission
/// workflow can be exercised in isolation.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, RepositoryError>;
    async fn update_listing(
        &self,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<(), RepositoryError>;
    async fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    async fn set_archived(&self, id: &ListingId, archived: bool) -> Result<(), RepositoryError>;
    async fn delete_listing(&self, id: &ListingId) -> Result<(), RepositoryError>;
    async fn insert_captions(&self, captions: Vec<PhotoCaption>) -> Result<(), RepositoryError>;
    async fn delete_captions(&self, image_paths: &[String]) -> Result<(), RepositoryError>;
    async fn captions_for(
        &self,
        image_paths: &[String],
    ) -> Result<Vec<PhotoCaption>, RepositoryError>;
}

/// Error enumeration for data-store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("data store unavailable: {0}")]
    Unavailable(String),
}
