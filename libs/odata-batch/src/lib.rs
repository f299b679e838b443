#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! OData protocol pieces for the batch gateway.
//!
//! This crate is pure data handling with no HTTP framework dependencies:
//!
//! - [`query`]: OData query string → backend filter syntax (`$filter=Year eq 2024` → `Year=eq.2024`)
//! - [`normalize`]: result-row key casing (`flightNum` → `FlightNum`)
//! - [`multipart`]: minimal `multipart/mixed` reader
//! - [`envelope`]: `$batch` request envelope → ordered [`BatchPart`]s
//! - [`response`]: ordered [`BatchResult`]s → `multipart/mixed` response body
//!
//! The HTTP layer (routing, backend calls, error rendering) lives in the
//! `odata-gateway` module.

pub mod envelope;
pub mod error;
pub mod multipart;
pub mod normalize;
pub mod query;
pub mod response;

pub use envelope::{BatchEnvelope, BatchPart};
pub use error::BatchError;
pub use normalize::{normalize_key, normalize_row};
pub use query::{BackendQuery, QueryParams, translate};
pub use response::{BatchResponse, BatchResult, RESPONSE_BOUNDARY, RESPONSE_CONTENT_TYPE};
