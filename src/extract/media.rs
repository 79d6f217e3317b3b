//! Featured-image extraction and archive image-URL rewriting.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::constants::ARCHIVE_WEB_URL;

static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).expect("valid selector"));

static TWITTER_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="twitter:image"]"#).expect("valid selector"));

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid selector"));

/// Alt-text keywords that mark a cover image.
const FEATURED_ALT_KEYWORDS: &[&str] = &[
    "featured", "hero", "main", "banner", "header", "kapak", "ana",
];

/// Minimum declared dimensions for an image to count as the lead image.
const MIN_WIDTH: u32 = 300;
const MIN_HEIGHT: u32 = 200;

/// Pick the page's featured image, rewritten to an archive image URL.
///
/// Empty string when the page has no usable image.
#[must_use]
pub fn extract_featured_image(doc: &Html, archive_url: &str) -> String {
    // Social-preview metadata is the most reliable source.
    for selector in [&*OG_IMAGE, &*TWITTER_IMAGE] {
        if let Some(content) = doc
            .select(selector)
            .find_map(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return to_archive_image_url(content, archive_url);
        }
    }

    let images: Vec<_> = doc.select(&IMG).collect();

    // Large declared dimensions first.
    for img in &images {
        let Some(src) = img.value().attr("src").filter(|s| !s.is_empty()) else {
            continue;
        };
        let width = img.value().attr("width").and_then(|w| w.parse::<u32>().ok());
        let height = img.value().attr("height").and_then(|h| h.parse::<u32>().ok());
        if let (Some(w), Some(h)) = (width, height) {
            if w >= MIN_WIDTH && h >= MIN_HEIGHT {
                return to_archive_image_url(src, archive_url);
            }
        }
    }

    // Cover-image alt keywords next.
    for img in &images {
        let Some(src) = img.value().attr("src").filter(|s| !s.is_empty()) else {
            continue;
        };
        let alt = img.value().attr("alt").unwrap_or_default().to_lowercase();
        if FEATURED_ALT_KEYWORDS.iter().any(|kw| alt.contains(kw)) {
            return to_archive_image_url(src, archive_url);
        }
    }

    // Otherwise the first image wins.
    for img in &images {
        if let Some(src) = img.value().attr("src").filter(|s| !s.is_empty()) {
            return to_archive_image_url(src, archive_url);
        }
    }

    String::new()
}

/// Rewrite an image URL into the archive's image-mode replay URL
/// (`…/web/<timestamp>im_/<absolute-url>`).
///
/// Relative URLs are resolved against the archived page's original URL.
/// URLs already pointing at the archive pass through untouched.
#[must_use]
pub fn to_archive_image_url(img_url: &str, archive_url: &str) -> String {
    if img_url.starts_with(ARCHIVE_WEB_URL) {
        return img_url.to_string();
    }
    let Some((timestamp, original_url)) = split_archive_url(archive_url) else {
        return img_url.to_string();
    };

    let absolute = if img_url.starts_with("http") {
        img_url.to_string()
    } else {
        Url::parse(original_url)
            .ok()
            .and_then(|base| base.join(img_url).ok())
            .map_or_else(|| img_url.to_string(), |joined| joined.to_string())
    };

    format!("{ARCHIVE_WEB_URL}/{timestamp}im_/{absolute}")
}

/// Split a replay URL into its timestamp and original-URL halves.
pub(crate) fn split_archive_url(archive_url: &str) -> Option<(&str, &str)> {
    let rest = archive_url.strip_prefix(&format!("{ARCHIVE_WEB_URL}/"))?;
    let (timestamp, original) = rest.split_once('/')?;
    if timestamp.is_empty() || original.is_empty() {
        return None;
    }
    Some((timestamp, original))
}
