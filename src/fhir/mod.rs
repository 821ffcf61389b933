//! FHIR record search and projection
//!
//! Wire types for the `Bundle`/`Patient` resources, the search client, and
//! the projector that turns a page of patients into sorted display lines.

mod bundle;
mod client;
mod projector;

pub use client::{FhirClient, MatchModifier, RecordSearch, SearchError};
#[cfg(test)]
pub use client::SearchResponse;
pub use projector::{RenderedNameList, ResultProjector, DEFAULT_ABSENT_MARKER};
