use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::domain::{ListingDraft, PUBLISH_PHOTO_FLOOR};

/// The six wizard sections, in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Title,
    Pricing,
    Location,
    Duration,
    Photos,
    Profile,
}

/// Whether the draft is being published for the first time or re-saved from
/// the edit flow. Edit saves deliberately skip the photo floor; the two
/// gates are kept distinct rather than unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Create,
    Edit,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Title,
        Section::Pricing,
        Section::Location,
        Section::Duration,
        Section::Photos,
        Section::Profile,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Section::Title => "title",
            Section::Pricing => "pricing",
            Section::Location => "location",
            Section::Duration => "duration",
            Section::Photos => "photos",
            Section::Profile => "profile",
        }
    }

    /// Completion predicate for this section. Each predicate reads only the
    /// fields its wizard step collects and has no side effects.
    pub fn is_complete(self, draft: &ListingDraft, mode: SubmitMode) -> bool {
        match self {
            Section::Title => {
                let title_len = draft.title.chars().count();
                let description_len = draft.description.chars().count();
                (1..=50).contains(&title_len) && (100..=500).contains(&description_len)
            }
            Section::Pricing => draft.price >= 1.0,
            Section::Location => !draft.address.label.is_empty(),
            Section::Duration => {
                parses_as_datetime(&draft.start_date) && parses_as_datetime(&draft.end_date)
            }
            Section::Photos => match mode {
                SubmitMode::Create => draft.photo_count() >= PUBLISH_PHOTO_FLOOR,
                SubmitMode::Edit => true,
            },
            Section::Profile => {
                !draft.affiliation.label().is_empty() && draft.phone.len() >= 10
            }
        }
    }
}

fn parses_as_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

/// Per-section completion snapshot for the wizard UI.
#[derive(Debug, Clone, Serialize)]
pub struct SectionStatus {
    pub section: Section,
    pub complete: bool,
}

pub fn section_statuses(draft: &ListingDraft, mode: SubmitMode) -> Vec<SectionStatus> {
    Section::ALL
        .iter()
        .map(|section| SectionStatus {
            section: *section,
            complete: section.is_complete(draft, mode),
        })
        .collect()
}

/// Sections still blocking submission.
pub fn incomplete_sections(draft: &ListingDraft, mode: SubmitMode) -> Vec<Section> {
    Section::ALL
        .into_iter()
        .filter(|section| !section.is_complete(draft, mode))
        .collect()
}

/// The submit control is enabled only when every section passes.
pub fn ready_to_submit(draft: &ListingDraft, mode: SubmitMode) -> bool {
    incomplete_sections(draft, mode).is_empty()
}
