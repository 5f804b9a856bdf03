//! Nobel laureates: harvest one record per laureate from the by-country
//! listing, enriched from each laureate's biography and Wikidata pages.

pub mod extract;
pub mod images;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod testing;
pub mod traits;
pub mod types;

pub use extract::{extract_biography, extract_listing, extract_wikidata};
pub use images::{attach_image, resolve_image};
pub use normalize::normalize;
pub use pipeline::{
    advance, CompletedRecord, EntityOutcome, EntityState, HarvestOptions, HarvestSummary,
    Harvester, Transition, WorkItem,
};
pub use progress::{ProgressEvent, ProgressEventKind, ProgressReporter, StageKind};
pub use traits::{FetchedPage, Fetcher, ImageStore, RecordSink};
pub use types::*;
