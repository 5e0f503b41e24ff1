use crate::image::first_srcset_image;
use crate::text;
use crate::util::normalize_url;
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use url::Url;

static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

/// One content item fetched from the source.
///
/// The raw title/body markup is never mutated; every display value is a pure
/// function of it, recomputed on access. `id` and `link` are stable for the
/// lifetime of a fetch session, and `link` doubles as the cache key for
/// image resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: u64,
    /// Publish timestamp as the source sent it: RFC 3339, or the
    /// no-timezone WordPress shape interpreted in the configured zone.
    pub date: String,
    /// Permalink of the post page.
    pub link: Url,
    title: Rendered,
    content: Rendered,
    #[serde(rename = "_embedded", default)]
    embedded: Embedded,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Embedded {
    #[serde(rename = "wp:featuredmedia", default)]
    featured_media: Vec<FeaturedMedia>,
}

/// The embed array can carry error objects instead of media records when
/// the attachment was deleted; every field defaults so that never fails the
/// whole post.
#[derive(Debug, Clone, Default, Deserialize)]
struct FeaturedMedia {
    #[serde(default)]
    source_url: Option<String>,
}

impl Post {
    /// Raw title markup as the source sent it.
    pub fn title_html(&self) -> &str {
        &self.title.rendered
    }

    /// Raw body markup as the source sent it.
    pub fn content_html(&self) -> &str {
        &self.content.rendered
    }

    /// The structured media URL the source attached, when its embedded-media
    /// record decoded into a valid URL. Preferred over any heuristic image.
    pub fn featured_media(&self) -> Option<Url> {
        let src = self.embedded.featured_media.first()?.source_url.as_deref()?;
        Url::parse(src).ok()
    }

    /// First usable image referenced by the body markup: the first `<img>`
    /// whose `src` normalizes against the permalink, else the first `srcset`
    /// in the body. Cheaper than the network resolver and tried before it.
    pub fn content_image(&self) -> Option<Url> {
        for captures in IMG_SRC_RE.captures_iter(&self.content.rendered) {
            if let Some(m) = captures.get(1) {
                if let Some(url) = normalize_url(m.as_str(), &self.link) {
                    return Some(url);
                }
            }
        }
        first_srcset_image(&self.content.rendered, &self.link)
    }

    /// Display image without touching the network: structured media first,
    /// then the content-HTML fallback. `None` means the caller may consult
    /// the [`ImageUrlResolver`](crate::image::ImageUrlResolver).
    pub fn image_url(&self) -> Option<Url> {
        self.featured_media().or_else(|| self.content_image())
    }

    /// Store name inferred from the title, when one of the heuristics hits.
    pub fn store_name(&self) -> Option<String> {
        text::store_name(&self.title.rendered)
    }

    /// Displayed price; the title always wins over the body.
    pub fn price(&self) -> Option<String> {
        text::price(&self.title.rendered, &self.content.rendered)
    }

    /// Title stripped of markup, `#Ad` markers and the inferred store prefix.
    pub fn clean_title(&self) -> String {
        text::clean_title(&self.title.rendered, self.store_name().as_deref())
    }

    /// Friendly publish timestamp ("Today 3:41 PM", "9/8 7:05 PM") in `tz`.
    pub fn display_timestamp(&self, tz: Tz) -> String {
        text::display_timestamp(&self.date, tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn post(value: serde_json::Value) -> Post {
        serde_json::from_value(value).unwrap()
    }

    fn minimal() -> serde_json::Value {
        serde_json::json!({
            "id": 42,
            "date": "2025-09-10T15:04:05",
            "link": "https://example.com/deals/echo-dot",
            "title": { "rendered": "[Amazon] Echo Dot for <b>$19.99</b>" },
            "content": { "rendered": "<p>Grab it for $19.99 before it sells out.</p>" }
        })
    }

    #[test]
    fn decodes_minimal_post() {
        let post = post(minimal());
        assert_eq!(post.id, 42);
        assert_eq!(post.link.as_str(), "https://example.com/deals/echo-dot");
        assert_eq!(post.title_html(), "[Amazon] Echo Dot for <b>$19.99</b>");
        assert!(post.featured_media().is_none());
    }

    #[test]
    fn decodes_embedded_featured_media() {
        let mut value = minimal();
        value["_embedded"] = serde_json::json!({
            "wp:featuredmedia": [ { "source_url": "https://cdn.example.com/echo.jpg" } ]
        });
        let post = post(value);
        assert_eq!(
            post.featured_media().unwrap().as_str(),
            "https://cdn.example.com/echo.jpg"
        );
    }

    #[test]
    fn malformed_embed_does_not_fail_the_post() {
        let mut value = minimal();
        // WP substitutes an error object when the attachment is gone.
        value["_embedded"] = serde_json::json!({
            "wp:featuredmedia": [ { "code": "rest_post_invalid_id", "status": 404 } ]
        });
        let post = post(value);
        assert!(post.featured_media().is_none());
    }

    #[test]
    fn invalid_media_url_decodes_as_absent() {
        let mut value = minimal();
        value["_embedded"] = serde_json::json!({
            "wp:featuredmedia": [ { "source_url": "not a url" } ]
        });
        assert!(post(value).featured_media().is_none());
    }

    #[test]
    fn content_image_prefers_first_img_src() {
        let mut value = minimal();
        value["content"]["rendered"] = serde_json::json!(
            r#"<p><img src="/wp-content/a.jpg"><img src="https://cdn.example.com/b.jpg"></p>"#
        );
        let post = post(value);
        assert_eq!(
            post.content_image().unwrap().as_str(),
            "https://example.com/wp-content/a.jpg"
        );
    }

    #[test]
    fn content_image_falls_back_to_srcset() {
        let mut value = minimal();
        value["content"]["rendered"] = serde_json::json!(
            r#"<source srcset="small.jpg 320w, large.jpg 1024w">"#
        );
        let post = post(value);
        assert_eq!(
            post.content_image().unwrap().as_str(),
            "https://example.com/deals/large.jpg"
        );
    }

    #[test]
    fn image_url_prefers_structured_media_over_content() {
        let mut value = minimal();
        value["content"]["rendered"] = serde_json::json!(r#"<img src="https://cdn.example.com/body.jpg">"#);
        value["_embedded"] = serde_json::json!({
            "wp:featuredmedia": [ { "source_url": "https://cdn.example.com/featured.jpg" } ]
        });
        let post = post(value);
        assert_eq!(
            post.image_url().unwrap().as_str(),
            "https://cdn.example.com/featured.jpg"
        );
    }

    #[test]
    fn derived_display_fields() {
        let post = post(minimal());
        assert_eq!(post.store_name().as_deref(), Some("Amazon"));
        assert_eq!(post.price().as_deref(), Some("$19.99"));
        assert_eq!(post.clean_title(), "Echo Dot for $19.99");
    }
}
