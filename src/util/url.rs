use url::Url;

/// Turns a raw attribute value into an absolute URL against `base`.
///
/// - already-absolute `http://` / `https://` strings pass through,
/// - protocol-relative `//host/…` gets an `https:` prefix,
/// - root-relative `/path` is spliced onto the base origin, discarding the
///   base's query and fragment,
/// - anything else resolves relative to `base`.
///
/// Returns `None` when the result cannot be parsed as a valid URL.
pub fn normalize_url(raw: &str, base: &Url) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Url::parse(trimmed).ok();
    }

    if trimmed.starts_with("//") {
        return Url::parse(&format!("https:{trimmed}")).ok();
    }

    if trimmed.starts_with('/') {
        let mut absolute = base.clone();
        absolute.set_path(trimmed);
        absolute.set_query(None);
        absolute.set_fragment(None);
        return Some(absolute);
    }

    base.join(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://example.com/deals/post-1?utm=x#frag").unwrap()
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = normalize_url("https://cdn.example.com/a.jpg", &base()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn protocol_relative_gets_https() {
        let url = normalize_url("//cdn.example.com/a.jpg", &base()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn root_relative_splices_onto_origin() {
        let url = normalize_url("/images/a.jpg", &base()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/images/a.jpg");
    }

    #[test]
    fn relative_resolves_against_base() {
        let url = normalize_url("a.jpg", &base()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/deals/a.jpg");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let url = normalize_url("  https://cdn.example.com/a.jpg \n", &base()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn garbage_yields_none() {
        assert!(normalize_url("", &base()).is_none());
        assert!(normalize_url("http://", &base()).is_none());
    }
}
