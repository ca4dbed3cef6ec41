use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use super::domain::{
    Affiliation, DraftAddress, Listing, ListingDraft, PhotoAttachment, PhotoCaption, UserId,
    EXISTING_PHOTO_SLOT_BASE,
};

/// Holds the single mutable draft for one create-or-edit session.
///
/// The store performs no validation; it is a plain holder handing out
/// snapshots so the wizard steps and the submission workflow all observe a
/// consistent draft.
#[derive(Debug, Default)]
pub struct DraftStore {
    draft: Mutex<ListingDraft>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current draft snapshot.
    pub fn read(&self) -> ListingDraft {
        self.draft.lock().expect("draft mutex poisoned").clone()
    }

    /// Shallow-merge the patch into the draft. Fields absent from the patch
    /// are left untouched; the merge is observable as soon as the call
    /// returns.
    pub fn update(&self, patch: DraftPatch) {
        let mut guard = self.draft.lock().expect("draft mutex poisoned");
        patch.apply(&mut guard);
    }

    /// Replace the whole draft at once, used by edit-mode hydration.
    pub fn replace(&self, draft: ListingDraft) {
        *self.draft.lock().expect("draft mutex poisoned") = draft;
    }

    /// Restore every field to its documented default.
    pub fn reset(&self) {
        *self.draft.lock().expect("draft mutex poisoned") = ListingDraft::default();
    }
}

/// Field-by-field patch applied by a single wizard step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub bed_count: Option<u32>,
    pub bath_count: Option<u32>,
    pub price: Option<f64>,
    pub price_notes: Option<String>,
    pub address: Option<DraftAddress>,
    pub location_notes: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub duration_notes: Option<String>,
    pub photos: Option<Vec<PhotoAttachment>>,
    pub photo_labels: Option<BTreeMap<u32, String>>,
    pub image_paths: Option<Vec<String>>,
    pub removed_image_paths: Option<Vec<String>>,
    pub affiliation: Option<Affiliation>,
    pub phone: Option<String>,
}

impl DraftPatch {
    fn apply(self, draft: &mut ListingDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(bed_count) = self.bed_count {
            draft.bed_count = bed_count;
        }
        if let Some(bath_count) = self.bath_count {
            draft.bath_count = bath_count;
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if let Some(price_notes) = self.price_notes {
            draft.price_notes = price_notes;
        }
        if let Some(address) = self.address {
            draft.address = address;
        }
        if let Some(location_notes) = self.location_notes {
            draft.location_notes = location_notes;
        }
        if let Some(start_date) = self.start_date {
            draft.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            draft.end_date = end_date;
        }
        if let Some(duration_notes) = self.duration_notes {
            draft.duration_notes = duration_notes;
        }
        if let Some(photos) = self.photos {
            draft.photos = photos;
        }
        if let Some(photo_labels) = self.photo_labels {
            draft.photo_labels = photo_labels;
        }
        if let Some(image_paths) = self.image_paths {
            draft.image_paths = image_paths;
        }
        if let Some(removed_image_paths) = self.removed_image_paths {
            draft.removed_image_paths = removed_image_paths;
        }
        if let Some(affiliation) = self.affiliation {
            draft.affiliation = affiliation;
        }
        if let Some(phone) = self.phone {
            draft.phone = phone;
        }
    }
}

/// Hands out one `DraftStore` per authenticated user so concurrent sessions
/// never share a draft.
#[derive(Debug, Default)]
pub struct DraftRegistry {
    stores: Mutex<HashMap<UserId, Arc<DraftStore>>>,
}

impl DraftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(&self, user: &UserId) -> Arc<DraftStore> {
        let mut guard = self.stores.lock().expect("registry mutex poisoned");
        Arc::clone(guard.entry(user.clone()).or_default())
    }
}

/// Build the edit-session draft for a stored listing: the listing's photo
/// keys become `image_paths`, and each caption slot is shifted by the
/// existing-photo base so new uploads and persisted photos never collide in
/// `photo_labels`.
pub fn draft_from_listing(listing: &Listing, captions: &[PhotoCaption]) -> ListingDraft {
    let mut photo_labels = BTreeMap::new();
    for caption in captions {
        if let Some(position) = listing
            .image_paths
            .iter()
            .position(|path| path == &caption.image_path)
        {
            photo_labels.insert(
                position as u32 + EXISTING_PHOTO_SLOT_BASE,
                caption.caption.clone(),
            );
        }
    }

    ListingDraft {
        title: listing.title.clone(),
        description: listing.description.clone(),
        bed_count: listing.bed_count,
        bath_count: listing.bath_count,
        price: listing.price,
        price_notes: listing.price_notes.clone(),
        address: DraftAddress {
            label: listing.address.clone(),
            description: String::new(),
        },
        location_notes: String::new(),
        start_date: listing.start_date.clone(),
        end_date: listing.end_date.clone(),
        duration_notes: listing.duration_notes.clone(),
        photos: Vec::new(),
        photo_labels,
        image_paths: listing.image_paths.clone(),
        removed_image_paths: Vec::new(),
        affiliation: listing.affiliation,
        phone: listing.phone.clone(),
    }
}
