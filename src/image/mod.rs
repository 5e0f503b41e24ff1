//! Heuristic image resolution for posts with no structured media.
//!
//! The module is organized into three submodules:
//!
//! - [`srcset`] - picks the best candidate out of an HTML `srcset` value
//! - [`cache`] - two-tier (memory + disk JSON) cache with TTL eviction
//! - [`resolver`] - fetches the post page and runs the meta-tag cascade
//!
//! A missing image is a legitimate outcome here, not an error: every failure
//! mode inside the cascade degrades to `None` and the caller shows a
//! placeholder.

mod cache;
mod resolver;
mod srcset;

pub use resolver::ImageUrlResolver;
pub use srcset::{best_from_srcset, first_srcset_image};
