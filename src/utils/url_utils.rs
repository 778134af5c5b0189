//! URL canonicalization utilities.
//!
//! Result links on listing pages carry tracking parameters and fragments
//! (`/title/tt0111161/?ref_=sr_t_1`). A title's identity is derived from the
//! canonical form so the same title reached through different links dedupes.

use url::Url;

/// A detail-page URL reduced to its canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalLink {
    /// Last non-empty path segment of the canonical URL
    pub id: String,
    /// Scheme, host and path; no query, no fragment, no trailing slash
    pub url: String,
}

/// Check if a URL is valid
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Resolve `href` against `base` and canonicalize it
///
/// Returns `None` for non-http(s) links and for links without a usable
/// path segment (e.g. the site root).
#[must_use]
pub fn canonicalize_link(base: &Url, href: &str) -> Option<CanonicalLink> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_query(None);
    resolved.set_fragment(None);

    let id = resolved
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()?
        .to_string();

    let host = resolved.host_str()?;
    let path = resolved.path().trim_end_matches('/');
    let url = match resolved.port() {
        Some(port) => format!("{}://{}:{}{}", resolved.scheme(), host, port, path),
        None => format!("{}://{}{}", resolved.scheme(), host, path),
    };

    Some(CanonicalLink { id, url })
}
