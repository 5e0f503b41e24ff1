//! Feed acquisition: the WordPress post model, the paginated HTTP client,
//! and the aggregator that owns the load-state machine and filtered views.
//!
//! The module is organized into three submodules:
//!
//! - [`post`] - the immutable Post entity and its derived display fields
//! - [`client`] - paginated fetch against the posts endpoint, bounded by a
//!   hard cap, with whole-cycle failure semantics
//! - [`aggregator`] - orchestrates fetch cycles and exposes filtered views
//!   and the store facet list

mod aggregator;
mod client;
mod post;

pub use aggregator::{FeedAggregator, LoadState};
pub use client::{FeedClient, FetchError};
pub use post::Post;
