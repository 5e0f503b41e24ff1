use super::post::Post;
use crate::config::Config;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Fields requested from the posts endpoint; everything else is dead weight
/// on the wire.
const FIELD_PROJECTION: &str = "id,date,link,title,content,_embedded";

/// Errors that make a whole fetch cycle fail.
///
/// There is no partial success: any page failing fails the cycle, and the
/// caller surfaces one terminal error for it.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// A page request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// A page body was not a valid JSON array of posts
    #[error("Malformed post JSON: {0}")]
    Decode(#[from] serde_json::Error),
    /// The configured posts endpoint is not a valid URL
    #[error("Invalid posts endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Paginated client for the WordPress posts endpoint.
///
/// Pages are requested newest-first with the embedded-media expansion and a
/// minimal field projection, concatenated in request order, and bounded by a
/// hard cap. Server ordering is trusted; re-sorting is the caller's call.
pub struct FeedClient {
    client: reqwest::Client,
    endpoint: Url,
    per_page: usize,
    max_posts: usize,
    timeout: Duration,
    after: Option<String>,
}

impl FeedClient {
    /// Builds a client from configuration. Fails only when the configured
    /// endpoint is not a parseable URL.
    pub fn new(client: reqwest::Client, config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: Url::parse(&config.base_posts)?,
            per_page: config.per_page,
            max_posts: config.max_posts,
            timeout: Duration::from_secs(config.request_timeout_secs),
            after: config.after.clone(),
        })
    }

    /// Fetches every matching post, newest first.
    ///
    /// Pagination stops at the first under-full page (end of data) or once
    /// the hard cap is reached, whichever comes first; the result is
    /// truncated to the cap. Any failed page fails the whole cycle.
    pub async fn fetch_all(&self, search: Option<&str>) -> Result<Vec<Post>, FetchError> {
        let mut all: Vec<Post> = Vec::new();
        let mut page = 1usize;

        loop {
            let url = self.page_url(search, page);
            let batch = self.fetch_page(&url).await?;
            let batch_len = batch.len();
            all.extend(batch);

            tracing::debug!(page, batch_len, total = all.len(), "Fetched feed page");

            if batch_len < self.per_page || all.len() >= self.max_posts {
                break;
            }
            page += 1;
        }

        all.truncate(self.max_posts);
        Ok(all)
    }

    fn page_url(&self, search: Option<&str>, page: usize) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("per_page", &self.per_page.to_string())
                .append_pair("_embed", "1")
                .append_pair("_fields", FIELD_PROJECTION)
                .append_pair("orderby", "date")
                .append_pair("order", "desc");
            if let Some(after) = &self.after {
                query.append_pair("after", after);
            }
            if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
                query.append_pair("search", term);
            }
            if page > 1 {
                query.append_pair("page", &page.to_string());
            }
        }
        url
    }

    async fn fetch_page(&self, url: &Url) -> Result<Vec<Post>, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_BODY_SIZE).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
