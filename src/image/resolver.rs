use super::cache::ResolverCache;
use super::srcset::first_srcset_image;
use crate::util::normalize_url;
use chrono::{Duration as TtlDuration, Utc};
use futures::StreamExt;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Resolved images are trusted for a week before the page is re-fetched.
const DEFAULT_TTL_DAYS: i64 = 7;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Pages are fetched with a mobile-browser UA; several deal sites serve the
/// meta-tag-bearing markup only to mobile clients.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile";

const MAX_HTML_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Meta-tag extraction cascade, in strict priority order. The secure OG
/// image outranks the plain one, OG outranks Twitter, and the legacy
/// `<link rel="image_src">` comes last.
static META_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)<meta\s+property=["']og:image:secure_url["']\s+content=["']([^"']+)["']"#,
        r#"(?i)<meta\s+property=["']og:image["']\s+content=["']([^"']+)["']"#,
        r#"(?i)<meta\s+name=["']twitter:image:src["']\s+content=["']([^"']+)["']"#,
        r#"(?i)<meta\s+name=["']twitter:image["']\s+content=["']([^"']+)["']"#,
        r#"(?i)<link\s+rel=["']image_src["']\s+href=["']([^"']+)["']"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Resolves a representative image for a post page by scraping its HTML,
/// with a persistent two-tier cache in front of the network.
///
/// Construct one per process with an explicit cache path and pass it to
/// whatever needs image resolution; there is no hidden global instance.
/// `resolve` is idempotent per page URL and safe to call concurrently: a
/// single async mutex serializes every read and write of the {memory, disk}
/// pair, while fetches run outside the lock. Two racing calls for the same
/// page may both hit the network; the last write into the cache wins.
pub struct ImageUrlResolver {
    client: reqwest::Client,
    cache: Mutex<ResolverCache>,
    timeout: Duration,
    user_agent: String,
}

impl ImageUrlResolver {
    /// Creates a resolver over the given HTTP client and cache file,
    /// loading and pruning any previously persisted index.
    pub fn new(client: reqwest::Client, cache_path: PathBuf) -> Self {
        let cache = ResolverCache::load(
            cache_path,
            TtlDuration::days(DEFAULT_TTL_DAYS),
            Utc::now(),
        );
        Self {
            client,
            cache: Mutex::new(cache),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Overrides the 7-day TTL. The cache is reloaded so load-time pruning
    /// reflects the new horizon.
    pub fn with_ttl(client: reqwest::Client, cache_path: PathBuf, ttl: TtlDuration) -> Self {
        let cache = ResolverCache::load(cache_path, ttl, Utc::now());
        Self {
            client,
            cache: Mutex::new(cache),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Overrides the 15s page-fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the mobile-browser user agent sent with page fetches.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolves a representative image URL for `page_url`.
    ///
    /// Short-circuits on the first success: memory cache, fresh disk entry
    /// (promoted to memory), then a bounded network fetch whose HTML runs
    /// through the meta-tag cascade and finally the first-`srcset` fallback.
    /// A fresh resolution is written through to both tiers; total failure
    /// caches nothing, so a later call retries the network.
    ///
    /// `None` means "no image" — transport errors, non-2xx statuses,
    /// undecodable bodies and cascade misses all land here and are only
    /// logged.
    pub async fn resolve(&self, page_url: &Url) -> Option<Url> {
        {
            let mut cache = self.cache.lock().await;
            if let Some(hit) = cache.lookup(page_url, Utc::now()) {
                tracing::trace!(page = %page_url, image = %hit, "Image cache hit");
                return Some(hit);
            }
        }

        let html = self.fetch_page(page_url).await?;
        let image =
            first_meta_image(&html, page_url).or_else(|| first_srcset_image(&html, page_url))?;

        tracing::debug!(page = %page_url, image = %image, "Resolved post image");
        let mut cache = self.cache.lock().await;
        cache.insert(page_url, &image, Utc::now());
        Some(image)
    }

    async fn fetch_page(&self, page_url: &Url) -> Option<String> {
        let request = self
            .client
            .get(page_url.clone())
            .header(reqwest::header::USER_AGENT, &self.user_agent);

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::debug!(page = %page_url, error = %e, "Image page fetch failed");
                return None;
            }
            Err(_) => {
                tracing::debug!(page = %page_url, timeout_secs = self.timeout.as_secs(), "Image page fetch timed out");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(page = %page_url, status = %response.status(), "Image page fetch returned error status");
            return None;
        }

        read_limited_text(response, MAX_HTML_SIZE).await
    }
}

/// Runs the five meta-tag patterns in order; the first non-empty capture
/// that also normalizes wins. A capture that fails normalization falls
/// through to the next pattern rather than aborting the cascade.
fn first_meta_image(html: &str, base: &Url) -> Option<Url> {
    for pattern in META_PATTERNS.iter() {
        if let Some(m) = pattern.captures(html).and_then(|c| c.get(1)) {
            if let Some(url) = normalize_url(m.as_str(), base) {
                return Some(url);
            }
        }
    }
    None
}

/// Best-effort UTF-8 body read with a hard size cap. Anything that is not
/// valid UTF-8 within the limit yields `None`.
async fn read_limited_text(response: reqwest::Response, limit: usize) -> Option<String> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            tracing::debug!(len, limit, "Image page body too large");
            return None;
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.ok()?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            tracing::debug!(limit, "Image page body exceeded size limit");
            return None;
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://example.com/deals/post-1").unwrap()
    }

    #[test]
    fn secure_og_image_outranks_everything() {
        let html = r#"
            <meta name="twitter:image" content="https://img.example.com/tw.jpg">
            <meta property="og:image" content="https://img.example.com/og.jpg">
            <meta property="og:image:secure_url" content="https://img.example.com/secure.jpg">
        "#;
        let url = first_meta_image(html, &base()).unwrap();
        assert_eq!(url.as_str(), "https://img.example.com/secure.jpg");
    }

    #[test]
    fn og_image_outranks_twitter() {
        let html = r#"
            <meta name="twitter:image:src" content="https://img.example.com/tw.jpg">
            <meta property="og:image" content="https://img.example.com/og.jpg">
        "#;
        let url = first_meta_image(html, &base()).unwrap();
        assert_eq!(url.as_str(), "https://img.example.com/og.jpg");
    }

    #[test]
    fn twitter_src_outranks_plain_twitter() {
        let html = r#"
            <meta name="twitter:image" content="https://img.example.com/plain.jpg">
            <meta name="twitter:image:src" content="https://img.example.com/src.jpg">
        "#;
        let url = first_meta_image(html, &base()).unwrap();
        assert_eq!(url.as_str(), "https://img.example.com/src.jpg");
    }

    #[test]
    fn link_image_src_is_last_resort() {
        let html = r#"<link rel="image_src" href="/images/hero.jpg">"#;
        let url = first_meta_image(html, &base()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/images/hero.jpg");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let html = r#"<META PROPERTY='og:image' CONTENT='https://img.example.com/og.jpg'>"#;
        let url = first_meta_image(html, &base()).unwrap();
        assert_eq!(url.as_str(), "https://img.example.com/og.jpg");
    }

    #[test]
    fn no_meta_tags_yields_none() {
        assert!(first_meta_image("<html><body>hi</body></html>", &base()).is_none());
    }
}
