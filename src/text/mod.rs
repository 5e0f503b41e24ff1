//! Pure text-extraction heuristics over raw post markup.
//!
//! Everything in this module is a total function: bad input degrades to a
//! "no match" `Option` or passes through unchanged, never an error. Derived
//! display values (price, store, cleaned title) are computed on demand from
//! the raw title/body HTML and are never stored back on the post.

mod timestamp;

pub use timestamp::{display_timestamp, display_timestamp_at};

use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*\d{1,3}(?:,\d{3})*(?:\.\d{2})?").expect("valid regex"));

/// Store-name cascade, evaluated in order with early exit. Priority:
/// `Store #Ad:` head, then `[Store]` bracket prefix, then `Store<sep>`.
static STORE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)^([A-Za-z0-9&'’.\- ]+)\s+#\s*Ad:?").expect("valid regex"),
        Regex::new(r"(?i)^\s*\[\s*([A-Za-z0-9&'’.\- ]+)\s*\]").expect("valid regex"),
        Regex::new(r"(?i)^\s*([A-Za-z0-9&'’.\- ]+)\s*[-–:|]\s*").expect("valid regex"),
    ]
});

static AD_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:#\s*ad)\s*:?[\s–-]*").expect("valid regex"));

static LEADING_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-–:|]\s*").expect("valid regex"));

/// Removes HTML tags and decodes the handful of entities WordPress actually
/// emits in deal titles. Unknown entities pass through unchanged.
///
/// Idempotent on already-stripped text.
pub fn strip_html(html: &str) -> String {
    TAG_RE
        .replace_all(html, "")
        .replace("&amp;", "&")
        .replace("&#8217;", "'")
        .replace("&#8220;", "\"")
        .replace("&#8221;", "\"")
        .replace("&#8230;", "…")
}

/// Extracts the leftmost price-looking token: `$` followed by up to three
/// digits, optional comma groups and optional two-decimal cents.
/// Whitespace inside the match (e.g. `$ 30`) is removed.
pub fn extract_price(text: &str) -> Option<String> {
    PRICE_RE
        .find(text)
        .map(|m| m.as_str().split_whitespace().collect())
}

/// Price for display: the title always wins over the body.
pub fn price(title_html: &str, body_html: &str) -> Option<String> {
    extract_price(&strip_html(title_html)).or_else(|| extract_price(&strip_html(body_html)))
}

/// Infers a store name from the start of the title, first match wins:
///
/// 1. `Macys #Ad: …`
/// 2. `[Amazon] …`
/// 3. `Target – …`, `Kohl's - …`, `Walmart: …`, `Best Buy | …`
///
/// An empty trimmed capture falls through to the next pattern. Pattern 3 is
/// knowingly greedy: a mid-sentence dash in a store-less title can produce a
/// false positive, and that behavior is preserved from the product.
pub fn store_name(title_html: &str) -> Option<String> {
    let raw = strip_html(title_html);
    for pattern in STORE_PATTERNS.iter() {
        if let Some(m) = pattern.captures(&raw).and_then(|c| c.get(1)) {
            let name = m.as_str().trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Strips markup and removes the `#Ad` marker and the leading store prefix
/// (when the store is known) from a title.
///
/// Order matters: the standalone `#Ad` marker is removed first because it can
/// precede the store segment (`#Ad: Macys – …`); the store-prefix pass then
/// also matches a trailing `Store #Ad:` head so both arrangements clean up.
pub fn clean_title(title_html: &str, store: Option<&str>) -> String {
    let mut title = strip_html(title_html);

    title = AD_MARKER_RE.replace(&title, "").into_owned();

    if let Some(store) = store.filter(|s| !s.is_empty()) {
        let escaped = regex::escape(store);
        let pattern = format!(
            r"(?i)^\s*(?:\[\s*{escaped}\s*\]\s*|{escaped}\s+#\s*ad:?\s*|{escaped}\s*[-–:|]\s*)"
        );
        if let Ok(re) = Regex::new(&pattern) {
            title = re.replace(&title, "").into_owned();
        }
    }

    title = LEADING_SEP_RE.replace(&title, "").into_owned();
    title.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strip_html_removes_tags_and_entities() {
        assert_eq!(
            strip_html("<b>Big &amp; Bold</b> &#8220;deal&#8221;&#8230;"),
            "Big & Bold \"deal\"…"
        );
        assert_eq!(strip_html("it&#8217;s <i>fine</i>"), "it's fine");
    }

    #[test]
    fn strip_html_passes_unknown_entities_through() {
        assert_eq!(strip_html("a &nbsp; b &lt;tag&gt;"), "a &nbsp; b &lt;tag&gt;");
    }

    #[test]
    fn strip_html_idempotent_on_plain_text() {
        let plain = "Nothing fancy here & no tags, just $5";
        assert_eq!(strip_html(&strip_html(plain)), strip_html(plain));
    }

    #[test]
    fn extract_price_basic() {
        assert_eq!(
            extract_price("Now $12,345.67 shipped").as_deref(),
            Some("$12,345.67")
        );
        assert_eq!(extract_price("only $30 today").as_deref(), Some("$30"));
        assert_eq!(extract_price("no price here"), None);
    }

    #[test]
    fn extract_price_takes_leftmost_and_strips_spaces() {
        assert_eq!(
            extract_price("was $ 99.99, now $49.99").as_deref(),
            Some("$99.99")
        );
    }

    #[test]
    fn price_prefers_title_over_body() {
        assert_eq!(
            price("<b>$9.99</b> deal", "$19.99").as_deref(),
            Some("$9.99")
        );
        assert_eq!(price("no price", "body has $19.99").as_deref(), Some("$19.99"));
        assert_eq!(price("nothing", "nothing either"), None);
    }

    #[test]
    fn store_name_ad_marker() {
        assert_eq!(store_name("Macys #Ad: Big Sale").as_deref(), Some("Macys"));
        assert_eq!(store_name("Best Buy #ad deal").as_deref(), Some("Best Buy"));
    }

    #[test]
    fn store_name_bracket_prefix() {
        assert_eq!(store_name("[Amazon] Echo Dot").as_deref(), Some("Amazon"));
        assert_eq!(store_name("  [ Kohl's ] towels").as_deref(), Some("Kohl's"));
    }

    #[test]
    fn store_name_separator() {
        assert_eq!(store_name("Target – Cheap stuff").as_deref(), Some("Target"));
        assert_eq!(store_name("Walmart: rollback").as_deref(), Some("Walmart"));
        assert_eq!(store_name("Best Buy | TV sale").as_deref(), Some("Best Buy"));
    }

    #[test]
    fn store_name_none_for_plain_title() {
        assert_eq!(store_name("Just a deal"), None);
    }

    #[test]
    fn store_name_works_over_markup() {
        assert_eq!(
            store_name("<strong>[Amazon]</strong> Fire TV").as_deref(),
            Some("Amazon")
        );
    }

    #[test]
    fn clean_title_removes_store_ad_head() {
        assert_eq!(
            clean_title("Macys #Ad: Big Sale", Some("Macys")),
            "Big Sale"
        );
    }

    #[test]
    fn clean_title_removes_leading_ad_then_store() {
        assert_eq!(
            clean_title("#Ad: Macys – Big Sale", Some("Macys")),
            "Big Sale"
        );
    }

    #[test]
    fn clean_title_removes_bracket_store() {
        assert_eq!(
            clean_title("[Amazon] Echo Dot for $19.99", Some("Amazon")),
            "Echo Dot for $19.99"
        );
    }

    #[test]
    fn clean_title_strips_leftover_separator() {
        assert_eq!(clean_title("[Amazon] - Echo Dot", Some("Amazon")), "Echo Dot");
    }

    #[test]
    fn clean_title_without_store_keeps_text() {
        assert_eq!(clean_title("Just a deal", None), "Just a deal");
        assert_eq!(clean_title("#Ad: nice find", None), "nice find");
    }

    #[test]
    fn clean_title_store_is_regex_escaped() {
        assert_eq!(
            clean_title("B&H (NY) - lens deal", Some("B&H (NY)")),
            "lens deal"
        );
    }
}
