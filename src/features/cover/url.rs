//! Cover URL helpers
//!
//! Resolution rewriting for NetEase image URLs, Meting proxy inspection
//! and CSS `url(...)` extraction.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;

lazy_static! {
    static ref PARAM_SIZE: Regex = Regex::new(r"([?&]param=)\d+y\d+").unwrap();
    static ref THUMBNAIL_SIZE: Regex = Regex::new(r"(?i)([?&]thumbnail=)\d+[xy]\d+").unwrap();
    static ref ASSET_HOST: Regex = Regex::new(r"(?i)(^|//)([^/]*\.)?music\.126\.net/").unwrap();
    static ref CSS_URL: Regex =
        Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"]*))\s*\)"#).unwrap();
}

/// Whether `url` points at the NetEase image CDN
pub fn is_asset_url(url: &str) -> bool {
    ASSET_HOST.is_match(url)
}

/// Ask the CDN for a bigger image.
///
/// Rewrites `param=WyH` or `thumbnail=WxH` to `target`, or appends
/// `param=target` to a bare CDN URL. Anything else comes back unchanged,
/// as does an already upgraded URL.
pub fn upgrade_resolution(url: &str, target: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }

    if PARAM_SIZE.is_match(url) {
        let replacement = format!("${{1}}{}", target);
        return PARAM_SIZE.replace_all(url, replacement.as_str()).into_owned();
    }
    if THUMBNAIL_SIZE.is_match(url) {
        let replacement = format!("${{1}}{}", target);
        return THUMBNAIL_SIZE
            .replace_all(url, replacement.as_str())
            .into_owned();
    }
    if is_asset_url(url) {
        let joiner = if url.contains('?') { '&' } else { '?' };
        return format!("{}{}param={}", url, joiner, target);
    }

    url.to_string()
}

/// Pull the address out of a CSS `url(...)` value
pub fn extract_css_url(value: &str) -> Option<String> {
    let caps = CSS_URL.captures(value)?;
    let inner = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

/// Wrap an address for a CSS `background-image`
pub fn css_url(url: &str) -> String {
    format!("url(\"{}\")", url.replace('"', "%22"))
}

/// A Meting `type=pic` proxy URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPic {
    /// Decoded `id` query value, if present
    pub pic_id: Option<String>,
}

/// Recognize a Meting picture proxy URL served by one of `hosts`
pub fn parse_proxy_pic(url: &str, hosts: &[String]) -> Option<ProxyPic> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    if !hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
        return None;
    }

    let mut is_pic = false;
    let mut pic_id = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "type" => is_pic = value.eq_ignore_ascii_case("pic"),
            "id" if pic_id.is_none() => {
                let value = value.trim();
                if !value.is_empty() {
                    pic_id = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    is_pic.then_some(ProxyPic { pic_id })
}

/// Append a `_=<millis>` query parameter so the browser or proxy can't
/// answer from cache
pub fn with_cache_buster(url: &str, millis: i64) -> String {
    let joiner = if url.contains('?') { '&' } else { '?' };
    format!("{}{}_={}", url, joiner, millis)
}
