use crate::util::normalize_url;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static SRCSET_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bsrcset\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

/// Resolves the first `srcset` attribute found anywhere in an HTML document
/// via [`best_from_srcset`]. Shared by the resolver's last cascade step and
/// the content-HTML fallback on posts.
pub fn first_srcset_image(html: &str, base: &Url) -> Option<Url> {
    let attr = SRCSET_ATTR_RE.captures(html)?.get(1)?.as_str();
    best_from_srcset(attr, base)
}

/// Picks the best candidate out of an HTML `srcset` attribute value and
/// normalizes it against `base`.
///
/// Each comma-separated item is `url [descriptor]`, the descriptor being an
/// integer width (`640w`) or a decimal pixel density (`2x`). Width-tagged
/// candidates always beat density-tagged or bare ones, even in mixed lists;
/// the largest width wins with ties going to the first seen. With no widths
/// at all, the largest density wins; with no descriptors at all, the first
/// candidate does.
///
/// Returns `None` when the list is empty or the winner fails normalization,
/// even if other raw candidates existed.
pub fn best_from_srcset(attr: &str, base: &Url) -> Option<Url> {
    let mut best: Option<&str> = None;
    let mut best_width: i64 = -1;
    let mut best_density: f64 = -1.0;

    for item in attr.split(',') {
        let mut parts = item.split_whitespace();
        let Some(candidate) = parts.next() else {
            continue;
        };

        let mut width = None;
        let mut density = None;
        for token in parts {
            if let Some(w) = token.strip_suffix('w').and_then(|t| t.parse::<i64>().ok()) {
                width = Some(w);
            }
            if let Some(d) = token.strip_suffix('x').and_then(|t| t.parse::<f64>().ok()) {
                density = Some(d);
            }
        }

        if let Some(w) = width {
            if w > best_width {
                best_width = w;
                best = Some(candidate);
            }
        } else if let Some(d) = density {
            // Density only competes while no width-tagged candidate has won.
            if best_width < 0 && d > best_density {
                best_density = d;
                best = Some(candidate);
            }
        } else if best.is_none() {
            best = Some(candidate);
        }
    }

    normalize_url(best?, base)
}
