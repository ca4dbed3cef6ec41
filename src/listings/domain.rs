use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caption slots at or above this base address photos that were already
/// persisted before the current edit session; slots below it address the
/// session's new uploads, so one label map can describe both groups.
pub const EXISTING_PHOTO_SLOT_BASE: u32 = 100;

/// A draft needs this many photos (new attachments plus already-persisted
/// ones) before it can be published.
pub const PUBLISH_PHOTO_FLOOR: usize = 5;

/// Identifier wrapper for persisted listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Identifier wrapper for the authenticated account owning a draft or
/// listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Self-reported Rice affiliation collected on the profile step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affiliation {
    #[default]
    Rice,
    Alum,
    None,
}

impl Affiliation {
    pub const fn label(self) -> &'static str {
        match self {
            Affiliation::Rice => "rice",
            Affiliation::Alum => "alum",
            Affiliation::None => "none",
        }
    }
}

/// Structured address as produced by the places autocomplete widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftAddress {
    pub label: String,
    pub description: String,
}

/// Newly attached photo: the client-side preview reference and the raw
/// bytes destined for object storage. One record per slot keeps the preview
/// and its payload tied to the same index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoAttachment {
    pub preview: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// In-progress listing composed across the six wizard steps. Held by a
/// `DraftStore` until submitted or reset; never persisted itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub bed_count: u32,
    pub bath_count: u32,
    pub price: f64,
    pub price_notes: String,
    pub address: DraftAddress,
    pub location_notes: String,
    pub start_date: String,
    pub end_date: String,
    pub duration_notes: String,
    pub photos: Vec<PhotoAttachment>,
    pub photo_labels: BTreeMap<u32, String>,
    pub image_paths: Vec<String>,
    pub removed_image_paths: Vec<String>,
    pub affiliation: Affiliation,
    pub phone: String,
}

impl ListingDraft {
    /// Photos counted toward the publish floor: new attachments plus photos
    /// already in storage from a previous save.
    pub fn photo_count(&self) -> usize {
        self.photos.len() + self.image_paths.len()
    }
}

/// Persisted listing row as stored by the backing data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
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
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

/// One caption row per captioned photo, keyed by the photo's storage path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoCaption {
    pub image_path: String,
    pub caption: String,
    pub owner: UserId,
}
