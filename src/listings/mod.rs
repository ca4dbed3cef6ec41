//! Listing draft composition, per-section completion gating, and the
//! create/edit submission workflow against the managed backend.

pub mod domain;
pub mod draft;
pub mod geo;
pub mod memory;
pub mod repository;
pub mod rest;
pub mod router;
pub mod sections;
pub mod storage;
pub mod submit;

#[cfg(test)]
mod tests;

pub use domain::{
    Affiliation, DraftAddress, Listing, ListingDraft, ListingId, PhotoAttachment, PhotoCaption,
    UserId, EXISTING_PHOTO_SLOT_BASE, PUBLISH_PHOTO_FLOOR,
};
pub use draft::{draft_from_listing, DraftPatch, DraftRegistry, DraftStore};
pub use repository::{ListingPatch, ListingRepository, NewListing, RepositoryError};
pub use router::{listing_router, ListingWizard};
pub use sections::{
    incomplete_sections, ready_to_submit, section_statuses, Section, SectionStatus, SubmitMode,
};
pub use storage::{PhotoStore, PhotoStoreError};
pub use submit::{CancelFlag, SubmissionOrchestrator, SubmitError};
