//! URL handling module for Ripple-Sitemap
//!
//! This module provides URL normalization and the scope filter that keeps a crawl
//! on the seed's host and path.

mod normalize;
mod scope;

// Re-export main functions
pub use normalize::{normalize, normalize_absolute, strip_query};
pub use scope::{in_scope, is_sitemap_url, Scope, EXCLUDED_EXTENSIONS};
