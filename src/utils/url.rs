// src/utils/url.rs

//! URL normalization utilities.
//!
//! Two raw URLs that point at the same page must map to the same key so the
//! crawler fetches it once. Normalization strips the fragment and cleans the
//! path lexically; scheme, host and query are left alone.

use url::Url;

use crate::error::{AppError, Result};

/// Normalize a raw URL string into a comparable key.
///
/// # Examples
/// ```
/// use sitecrawler::utils::url::normalize;
///
/// assert_eq!(
///     normalize("http://example.com/a/./b/../c#top").unwrap(),
///     "http://example.com/a/c"
/// );
/// ```
pub fn normalize(raw: &str) -> Result<String> {
    let mut url = request_url(raw)?;

    if !url.cannot_be_a_base() {
        let cleaned = clean_path(url.path());
        url.set_path(&cleaned);
    }

    Ok(url.into())
}

/// Parse a raw URL and drop its fragment, leaving the path as written.
///
/// This is the address a page is fetched from, and the base its relative
/// links resolve against. A trailing slash matters here: `guide.html` on
/// `/docs/` is `/docs/guide.html`.
///
/// # Examples
/// ```
/// use sitecrawler::utils::url::request_url;
///
/// assert_eq!(
///     request_url("http://example.com/docs/#intro").unwrap().as_str(),
///     "http://example.com/docs/"
/// );
/// ```
pub fn request_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| AppError::invalid_url(raw, e))?;
    url.set_fragment(None);
    Ok(url)
}

/// Lexically clean a URL path.
///
/// Collapses `.` and `..` segments and repeated slashes and drops a trailing
/// slash. An empty result becomes the root `/`.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Extract the lowercase host from a URL string.
///
/// # Examples
/// ```
/// use sitecrawler::utils::url::get_host;
///
/// assert_eq!(
///     get_host("https://Example.COM/path"),
///     Some("example.com".to_string())
/// );
/// ```
pub fn get_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
