//! URL normalization, canonical grouping keys, and junk filtering.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Path suffixes that alias the page they hang off of.
const VARIANT_SUFFIXES: &[&str] = &["/feed", "/amp", "/embed", "/print", "/trackback"];

/// Index filenames that alias their directory.
const INDEX_FILES: &[&str] = &["index.html", "index.php", "index.htm"];

/// System and noise URLs that are never worth grouping.
static JUNK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"wp-login\.php",
        r"wp-admin",
        r"/feed/",
        r"/comments/feed/",
        r"/sitemap\.xml",
        r"/robots\.txt",
        r"\.json$",
        r"\.xml$",
        r"\.css$",
        r"\.js$",
        r"\?replytocom",
        r"\.gz$",
        r"\.zip$",
        r"\.rar$",
        r"\.tar\.gz$",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid junk pattern"))
    .collect()
});

/// CMS-internal paths and binary assets; a broader net than [`is_junk_url`].
static EXTRA_JUNK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"wp-json",
        r"wp-includes",
        r"wp-content",
        r"contact-form-7",
        r"oembed",
        r"\.js$",
        r"\.css$",
        r"\.jpg$",
        r"\.jpeg$",
        r"\.png$",
        r"\.gif$",
        r"\.svg$",
        r"\.ico$",
        r"\.xml$",
        r"\.json$",
        r"\.woff$",
        r"\.ttf$",
        r"\.pdf$",
        r"\.zip$",
        r"\.gz$",
        r"\.tar$",
        r"\.mp4$",
        r"\.mp3$",
        r"\.webp$",
        r"\.avi$",
        r"\.mov$",
        r"\.wmv$",
        r"\.flv$",
        r"\.mkv$",
        r"\.apk$",
        r"\.exe$",
        r"\.bin$",
        r"\.dmg$",
        r"\.msi$",
        r"\.tar\.gz$",
        r"\.rar$",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid extra-junk pattern"))
    .collect()
});

/// Normalize a URL for display deduplication by dropping an explicit port.
///
/// Grouping uses [`smart_url_key`] instead; this keeps the rest of the URL
/// byte-identical so it can still be fetched.
#[must_use]
pub fn normalize_display_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    // port() is None for scheme-default ports, which still appear in the raw
    // string; port_or_known_default covers both, gated on actual presence.
    match parsed.port_or_known_default() {
        Some(port) if url.contains(&format!(":{port}")) => {
            url.replacen(&format!(":{port}"), "", 1)
        }
        _ => url.to_string(),
    }
}

/// Derive the canonical grouping key for a URL.
///
/// Two URLs that are the same logical page under common site conventions
/// (trailing slash, `www.`, `index.html`, feed/amp/print variants, `.html`
/// extension) map to the same key. Collisions between genuinely distinct
/// pages are an accepted heuristic risk.
#[must_use]
pub fn smart_url_key(url: &str) -> String {
    let (netloc, mut path) = match Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().map(ToString::to_string).map_or_else(
                String::new,
                |host| match parsed.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host,
                },
            ),
            parsed.path().to_string(),
        ),
        // Schemeless input: treat the first segment as the authority.
        Err(_) => match url.split_once('/') {
            Some((host, rest)) => (host.to_string(), format!("/{rest}")),
            None => (url.to_string(), String::new()),
        },
    };

    for suffix in VARIANT_SUFFIXES {
        if let Some(stripped) = path.strip_suffix(suffix) {
            path = stripped.to_string();
            break;
        }
    }
    if path.ends_with('/') && path != "/" {
        path.pop();
    }
    for idx in INDEX_FILES {
        if let Some(stripped) = path.strip_suffix(&format!("/{idx}")) {
            path = stripped.to_string();
            break;
        }
    }
    for ext in [".html", ".htm"] {
        if let Some(stripped) = path.strip_suffix(ext) {
            path = stripped.to_string();
            break;
        }
    }

    let netloc = netloc.strip_prefix("www.").unwrap_or(&netloc);
    format!("{netloc}{path}").to_lowercase()
}

/// Check whether a URL matches the junk denylist.
#[must_use]
pub fn is_junk_url(url: &str) -> bool {
    JUNK_PATTERNS.iter().any(|p| p.is_match(url))
}

/// Check whether a URL matches the broader CMS/binary denylist.
#[must_use]
pub fn is_extra_junk(url: &str) -> bool {
    EXTRA_JUNK_PATTERNS.iter().any(|p| p.is_match(url))
}

/// Extract the host from a URL, without any `www.` prefix, lowercased.
#[must_use]
pub fn bare_domain(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToString::to_string))
        .unwrap_or_else(|| {
            url.trim_start_matches("http://")
                .trim_start_matches("https://")
                .split('/')
                .next()
                .unwrap_or_default()
                .to_string()
        });
    let host = host.to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_trailing_slash_and_www() {
        assert_eq!(
            smart_url_key("http://www.ex.com/a/"),
            smart_url_key("http://ex.com/a/index.html")
        );
        assert_eq!(smart_url_key("http://www.ex.com/a/"), "ex.com/a");
    }

    #[test]
    fn test_key_strips_variant_suffixes() {
        assert_eq!(smart_url_key("http://ex.com/post-1/feed"), "ex.com/post-1");
        assert_eq!(smart_url_key("http://ex.com/post-1/amp"), "ex.com/post-1");
        assert_eq!(
            smart_url_key("http://ex.com/post-1/trackback"),
            "ex.com/post-1"
        );
    }

    #[test]
    fn test_key_strips_html_extension() {
        assert_eq!(smart_url_key("http://ex.com/about.html"), "ex.com/about");
        assert_eq!(smart_url_key("http://ex.com/about.htm"), "ex.com/about");
    }

    #[test]
    fn test_key_keeps_root_slash() {
        // The root path is exempt from trailing-slash removal.
        assert_eq!(smart_url_key("http://ex.com/"), "ex.com/");
        assert_eq!(smart_url_key("http://ex.com"), "ex.com/");
        assert_eq!(smart_url_key("http://ex.com/index.php"), "ex.com");
    }

    #[test]
    fn test_key_lowercases() {
        assert_eq!(
            smart_url_key("http://Ex.Com/Some/Path"),
            "ex.com/some/path"
        );
    }

    #[test]
    fn test_key_preserves_port() {
        assert_eq!(smart_url_key("http://ex.com:8080/a"), "ex.com:8080/a");
    }

    #[test]
    fn test_normalize_display_url_strips_port() {
        assert_eq!(
            normalize_display_url("http://ex.com:8080/a"),
            "http://ex.com/a"
        );
        assert_eq!(
            normalize_display_url("http://ex.com:80/a"),
            "http://ex.com/a"
        );
        assert_eq!(normalize_display_url("http://ex.com/a"), "http://ex.com/a");
    }

    #[test]
    fn test_junk_urls() {
        assert!(is_junk_url("http://ex.com/wp-login.php"));
        assert!(is_junk_url("http://ex.com/a/feed/"));
        assert!(is_junk_url("http://ex.com/style.css"));
        assert!(is_junk_url("http://ex.com/post?replytocom=5"));
        assert!(!is_junk_url("http://ex.com/2020/05/my-post"));
    }

    #[test]
    fn test_extra_junk_urls() {
        assert!(is_extra_junk("http://ex.com/wp-content/uploads/a.jpg"));
        assert!(is_extra_junk("http://ex.com/wp-json/wp/v2/posts"));
        assert!(is_extra_junk("http://ex.com/video.mp4"));
        assert!(!is_extra_junk("http://ex.com/blog/hello-world"));
    }

    #[test]
    fn test_bare_domain() {
        assert_eq!(bare_domain("http://www.Example.com/a/b"), "example.com");
        assert_eq!(bare_domain("example.com/a"), "example.com");
    }
}
