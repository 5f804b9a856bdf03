//! Field extraction for each page type.
//!
//! Every function here is synchronous and total: missing or malformed markup
//! degrades to the field's default instead of an error. `scraper` documents
//! are `!Send`, so none of these may be held across an `.await`.

pub mod biography;
pub mod listing;
pub mod wikidata;

pub use biography::{absolutize_links, extract_biography, BiographyExtract};
pub use listing::{extract_listing, last_category, last_year, seed_fields};
pub use wikidata::{extract_wikidata, Property, WikidataExtract};
