//! Fetch error classification
//!
//! Maps every failed fetch onto the single status code reported in its error
//! notification. The mapping is total and never fails.

use crate::crawler::fetcher::{FetchErrorKind, FetchFailure};

/// Code reported for pages that do not exist
pub const NOT_FOUND: u16 = 404;

/// Code reported for fetches that timed out
pub const REQUEST_TIMEOUT: u16 = 408;

/// Code reported when nothing more specific is known
pub const INTERNAL_ERROR: u16 = 500;

/// Classifies a failed fetch
///
/// | Condition | Code |
/// |-----------|------|
/// | HTTP 404 or 410 | 404 |
/// | DNS resolution failure | 404 |
/// | Timeout | 408 |
/// | Any other HTTP status | that status |
/// | Anything else | 500 |
pub fn classify(failure: &FetchFailure) -> u16 {
    match (failure.status_code, failure.kind) {
        (Some(404) | Some(410), _) => NOT_FOUND,
        (_, FetchErrorKind::Dns) => NOT_FOUND,
        (_, FetchErrorKind::Timeout) => REQUEST_TIMEOUT,
        (Some(code), _) => code,
        (None, _) => INTERNAL_ERROR,
    }
}
