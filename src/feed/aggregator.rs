use super::client::FeedClient;
use super::post::Post;
use std::collections::BTreeSet;

/// What a fetch cycle is currently doing. Consumers render off this; it
/// carries no business logic of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Orchestrates fetch cycles and owns the working set of posts.
///
/// One fetch cycle replaces the whole working set; a failed cycle flips the
/// state to `Failed` but leaves the previously loaded posts untouched, so a
/// consumer can keep showing stale data next to a retry affordance. Partial
/// results from a failed fetch are never merged in.
pub struct FeedAggregator {
    client: FeedClient,
    state: LoadState,
    posts: Vec<Post>,
    query: String,
    selected_store: Option<String>,
}

impl FeedAggregator {
    pub fn new(client: FeedClient) -> Self {
        Self {
            client,
            state: LoadState::Idle,
            posts: Vec::new(),
            query: String::new(),
            selected_store: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// The full working set from the last successful fetch, newest first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// First load: only acts from `Idle`. Subsequent reloads go through
    /// [`refresh`](Self::refresh).
    pub async fn load(&mut self) {
        if self.state == LoadState::Idle {
            self.refresh().await;
        }
    }

    /// Runs one fetch cycle: `Loading`, then `Loaded` with a fresh working
    /// set (ordered by publish date descending) or `Failed` with the error
    /// description.
    pub async fn refresh(&mut self) {
        self.state = LoadState::Loading;
        match self.client.fetch_all(None).await {
            Ok(mut fetched) => {
                // Stable secondary sort; the server already orders by date
                // but pages can interleave around equal timestamps.
                fetched.sort_by(|a, b| b.date.cmp(&a.date));
                tracing::info!(count = fetched.len(), "Feed refresh complete");
                self.posts = fetched;
                self.state = LoadState::Loaded;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Feed refresh failed");
                self.state = LoadState::Failed(e.to_string());
            }
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn select_store(&mut self, store: Option<String>) {
        self.selected_store = store;
    }

    /// The filtered view: query and selected store are case-insensitive
    /// substring matches against the raw title markup, ANDed; an absent
    /// filter passes everything. Recomputed on every call.
    pub fn visible_posts(&self) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|post| {
                matches_filters(post.title_html(), &self.query, self.selected_store.as_deref())
            })
            .collect()
    }

    /// Distinct store names inferred across the loaded working set,
    /// alphabetically sorted. The name is the product's; it reflects
    /// whatever window the fetch covered, not a literal seven days.
    pub fn stores_last_week(&self) -> Vec<String> {
        self.posts
            .iter()
            .filter_map(Post::store_name)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn matches_filters(title_html: &str, query: &str, store: Option<&str>) -> bool {
    let title = title_html.to_lowercase();
    let query_ok = query.is_empty() || title.contains(&query.to_lowercase());
    let store_ok = store
        .filter(|s| !s.is_empty())
        .map_or(true, |s| title.contains(&s.to_lowercase()));
    query_ok && store_ok
}

// Keeps the facet helper honest without a network round-trip; the state
// machine itself is covered by the wiremock integration tests.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_pass_everything() {
        assert!(matches_filters("Nike running shoes", "", None));
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        assert!(matches_filters("Nike Running SHOE sale", "shoe", None));
        assert!(!matches_filters("Adidas sale", "shoe", None));
    }

    #[test]
    fn store_filter_matches_raw_title_markup() {
        assert!(matches_filters("<b>Nike</b> shoe sale", "", Some("nike")));
        assert!(!matches_filters("Adidas shoe sale", "", Some("nike")));
    }

    #[test]
    fn query_and_store_are_anded() {
        assert!(matches_filters("Nike shoe sale", "shoe", Some("Nike")));
        assert!(!matches_filters("Nike sock sale", "shoe", Some("Nike")));
        assert!(!matches_filters("Adidas shoe sale", "shoe", Some("Nike")));
    }

    #[test]
    fn empty_store_selection_passes() {
        assert!(matches_filters("Adidas shoe sale", "", Some("")));
    }
}
