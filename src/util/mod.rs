//! Shared helpers.
//!
//! Currently just URL normalization, which both the image resolver and the
//! content-HTML fallback image logic go through.

mod url;

pub use url::normalize_url;
