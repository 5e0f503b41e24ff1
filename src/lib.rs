//! Data-acquisition and normalization layer for a deal-listing feed.
//!
//! Given a WordPress-style content source, this crate:
//!
//! - retrieves and paginates through all matching posts ([`feed`]),
//! - resolves a representative image per post when the structured media
//!   field is absent, via an HTML-scraping cascade behind a persistent
//!   two-tier cache ([`image`]),
//! - recovers store name, displayed price and a cleaned title from the raw
//!   markup through ordered pattern-matching heuristics ([`text`]).
//!
//! Rendering, navigation and theming are out of scope; the bundled binary
//! is a thin CLI consumer of the normalized post list.

pub mod config;
pub mod feed;
pub mod image;
pub mod text;
pub mod util;

pub use config::Config;
pub use feed::{FeedAggregator, FeedClient, FetchError, LoadState, Post};
pub use image::ImageUrlResolver;
