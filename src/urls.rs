//! Wikipedia article URL recognition and normalisation

use once_cell::sync::Lazy;
use regex::Regex;

/// Base against which relative `/wiki/...` links are resolved.
pub const WIKI_BASE: &str = "https://es.wikipedia.org";

static ARTICLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\A(http(s)?://es\.wikipedia\.org)?/wiki/[\w/_()%]+\z").unwrap()
});

/// Whether `url` is a Spanish-Wikipedia article link, absolute or
/// site-relative. The whole string must match; query strings, fragments
/// and non-article namespaces with characters outside the class are
/// rejected.
pub fn is_article_url(url: &str) -> bool {
    ARTICLE_RE.is_match(url)
}

/// Turn a site-relative link into an absolute one. Links already starting
/// with `http` pass through untouched; anything the base cannot absorb is
/// returned as-is and left to [`is_article_url`] to reject.
pub fn ensure_absolute(link: &str) -> String {
    if link.starts_with("http") {
        return link.to_string();
    }
    match url::Url::parse(WIKI_BASE).and_then(|base| base.join(link)) {
        Ok(joined) => joined.to_string(),
        Err(_) => link.to_string(),
    }
}
