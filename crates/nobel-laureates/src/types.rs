//! Core data types for laureate records and harvest errors.

use serde::{Deserialize, Serialize};
use url::Url;

/// One of the six prize categories, or unspecified when the listing entry
/// names none of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Chemistry,
    Economics,
    Literature,
    Peace,
    Physics,
    #[serde(rename = "Physiology or Medicine")]
    PhysiologyOrMedicine,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl Category {
    /// Every named category, in the order they are tried during a scan.
    pub const ALL: [Category; 6] = [
        Category::Chemistry,
        Category::Economics,
        Category::Literature,
        Category::Peace,
        Category::Physics,
        Category::PhysiologyOrMedicine,
    ];

    /// The literal text of the category as it appears on the site.
    pub fn label(self) -> &'static str {
        match self {
            Self::Chemistry => "Chemistry",
            Self::Economics => "Economics",
            Self::Literature => "Literature",
            Self::Peace => "Peace",
            Self::Physics => "Physics",
            Self::PhysiologyOrMedicine => "Physiology or Medicine",
            Self::Unspecified => "",
        }
    }

    pub fn is_unspecified(self) -> bool {
        self == Self::Unspecified
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference to an image persisted by an [`ImageStore`](crate::traits::ImageStore),
/// usually a path relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageRef(pub String);

impl StorageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields produced by the listing stage for a single index entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedFields {
    pub name: String,
    pub year: u32,
    pub category: Category,
    pub country: String,
    pub place_of_birth: Option<String>,
}

/// The accumulator for one laureate, carried through every stage.
///
/// `link` is fixed at construction. The structured-data stage has the final
/// word on the demographic fields (`date_of_*`, `place_of_*`, `gender`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaureateRecord {
    pub name: String,
    link: Url,
    /// 0 when no year was found.
    pub year: u32,
    pub category: Category,
    /// Empty for asterisk cross-reference entries.
    pub country: String,
    /// Never populated by any stage; kept for schema compatibility.
    pub born_in: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_death: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// HTML fragment with absolute hyperlinks; `None` until the biography
    /// stage has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mini_bio: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio_image: Option<StorageRef>,
}

impl LaureateRecord {
    /// Create a record from listing-stage fields. Everything the later stages
    /// fill in starts out unset.
    pub fn seed(link: Url, fields: SeedFields) -> Self {
        Self {
            name: fields.name,
            link,
            year: fields.year,
            category: fields.category,
            country: fields.country,
            born_in: String::new(),
            date_of_birth: None,
            date_of_death: None,
            place_of_birth: fields.place_of_birth,
            place_of_death: None,
            gender: None,
            mini_bio: None,
            image_urls: Vec::new(),
            bio_image: None,
        }
    }

    /// The biography page this record was seeded from.
    pub fn link(&self) -> &Url {
        &self.link
    }
}

/// All errors that can occur while harvesting.
///
/// Extraction itself never fails; these cover the collaborators (transport,
/// image store, sink) and cancellation.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("harvest cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type HarvestResult<T> = Result<T, HarvestError>;
