//! Title extraction cascade.
//!
//! Each tier exists because some real site only yields a usable title there;
//! tiers run in order and the first candidate passing validation wins.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::text::humanize_slug;

static TITLE_TAG: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid selector"));
static H2: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").expect("valid selector"));
static H3: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("valid selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));
static CANONICAL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="canonical"]"#).expect("valid selector"));
static OG_URL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:url"]"#).expect("valid selector"));

static META_TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[property="og:title"]"#,
        r#"meta[name="twitter:title"]"#,
        r#"meta[name="title"]"#,
        r#"meta[property="twitter:title"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static TITLE_CLASS_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".post-title",
        ".entry-title",
        ".article-title",
        ".page-title",
        ".title",
        ".headline",
        ".post-headline",
        ".entry-headline",
        ".article-headline",
        r#"[itemprop="headline"]"#,
        r#"[itemprop="name"]"#,
        "#title",
        "#post-title",
        "#entry-title",
        "#article-title",
        ".content-title",
        ".main-title",
        ".blog-title",
        ".news-title",
        "h1.post-title",
        "h1.entry-title",
        "h1.article-title",
        ".post h1",
        ".entry h1",
        ".article h1",
        "h2",
        "h3",
        ".page-header",
        ".page-headline",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid pattern"));
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{1,2}[./-]\d{1,2}[./-]\d{2,4}\b").expect("valid pattern")
});

/// Separators that commonly join a post title to the site name.
const TITLE_SEPARATORS: &[&str] = &[" - ", " | ", " :: ", " : ", " » ", " › ", " — ", "–"];

/// Extract the page title, or `None` when no tier yields a valid candidate.
#[must_use]
pub fn extract_title(doc: &Html, archive_url: &str) -> Option<String> {
    // 1. <title>, cleaned of site-name and date noise.
    if let Some(el) = doc.select(&TITLE_TAG).next() {
        let raw = el.text().collect::<String>();
        let cleaned = clean_title_text(&raw);
        if is_valid_title(&cleaned) {
            return Some(cleaned);
        }
    }

    // 2. First acceptable <h1>.
    for h1 in doc.select(&H1) {
        let text = h1.text().collect::<String>().trim().to_string();
        if is_valid_title(&text) {
            return Some(text);
        }
    }

    // 3. Social metadata titles.
    for selector in META_TITLE_SELECTORS.iter() {
        if let Some(content) = doc
            .select(selector)
            .find_map(|el| el.value().attr("content"))
        {
            let text = content.trim().to_string();
            if is_valid_title(&text) {
                return Some(text);
            }
        }
    }

    // 4. Common title classes and ids.
    for selector in TITLE_CLASS_SELECTORS.iter() {
        if let Some(el) = doc.select(selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if is_valid_title(&text) {
                return Some(text);
            }
        }
    }

    // 5. Any acceptable h2/h3, not just the first.
    for selector in [&*H2, &*H3] {
        for heading in doc.select(selector) {
            let text = heading.text().collect::<String>().trim().to_string();
            if is_valid_title(&text) {
                return Some(text);
            }
        }
    }

    // 6. First substantial paragraph, truncated.
    for p in doc.select(&PARAGRAPH) {
        let text = p.text().collect::<String>().trim().to_string();
        if text.len() > 20 {
            let title: String = text.chars().take(60).collect();
            let title = title.trim_end().trim_end_matches("...").to_string();
            return Some(title);
        }
    }

    // 7. Filename segment of the canonical/OG URL (the archive URL carries
    // the original URL, so it works for replay pages too).
    let candidate_url = doc
        .select(&OG_URL)
        .find_map(|el| el.value().attr("content").map(ToString::to_string))
        .or_else(|| {
            doc.select(&CANONICAL)
                .find_map(|el| el.value().attr("href").map(ToString::to_string))
        })
        .unwrap_or_else(|| archive_url.to_string());
    if let Some(title) = title_from_url(&candidate_url) {
        return Some(title);
    }

    None
}

/// Strip date noise and site-name segments from a raw `<title>` text.
fn clean_title_text(raw: &str) -> String {
    let mut title = YEAR.replace_all(raw, "").into_owned();
    title = DATE.replace_all(&title, "").into_owned();
    title = title.trim().to_string();

    for sep in TITLE_SEPARATORS {
        if title.contains(sep) {
            // Keep the longest segment; short ones are site names or slogans.
            if let Some(longest) = title
                .split(sep)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .max_by_key(|p| p.len())
            {
                title = longest.to_string();
            }
            break;
        }
    }
    title
}

fn is_valid_title(title: &str) -> bool {
    title.len() > 10 && title.len() < 200 && !title.to_lowercase().starts_with("index of")
}

/// Derive a humanized title from the last path segment of a URL.
fn title_from_url(url: &str) -> Option<String> {
    // Replay URLs embed the original URL after the timestamp.
    let effective = crate::extract::media::split_archive_url(url)
        .map_or(url, |(_ts, original)| original);
    let parsed = Url::parse(effective).ok()?;
    let last = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .to_string();
    let title = humanize_slug(&last);
    (title.len() > 5 && !title.to_lowercase().starts_with("index of")).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCHIVE: &str =
        "https://web.archive.org/web/20200101000000/http://ex.com/2020/05/my-first-post";

    #[test]
    fn test_title_tag_cleaned_of_site_name() {
        let doc = Html::parse_document(
            "<html><head><title>A Long Enough Post Title - Short Site</title></head></html>",
        );
        assert_eq!(
            extract_title(&doc, ARCHIVE).as_deref(),
            Some("A Long Enough Post Title")
        );
    }

    #[test]
    fn test_title_tag_strips_years() {
        let doc = Html::parse_document(
            "<html><head><title>Review of the thing 2019 edition</title></head></html>",
        );
        assert_eq!(
            extract_title(&doc, ARCHIVE).as_deref(),
            Some("Review of the thing  edition")
        );
    }

    #[test]
    fn test_h1_fallback() {
        let doc = Html::parse_document(
            "<html><head><title>short</title></head><body><h1>A Heading That Works Fine</h1></body></html>",
        );
        assert_eq!(
            extract_title(&doc, ARCHIVE).as_deref(),
            Some("A Heading That Works Fine")
        );
    }

    #[test]
    fn test_og_title_fallback() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:title" content="Social Preview Title Here"></head></html>"#,
        );
        assert_eq!(
            extract_title(&doc, ARCHIVE).as_deref(),
            Some("Social Preview Title Here")
        );
    }

    #[test]
    fn test_paragraph_truncation() {
        let doc = Html::parse_document(
            "<html><body><p>The quick brown fox jumps over the lazy dog near the river bank today.</p></body></html>",
        );
        let title = extract_title(&doc, ARCHIVE).unwrap();
        assert!(title.chars().count() <= 60);
        assert!(title.starts_with("The quick brown fox"));
    }

    #[test]
    fn test_url_slug_fallback() {
        let doc = Html::parse_document("<html><head></head><body></body></html>");
        assert_eq!(
            extract_title(&doc, ARCHIVE).as_deref(),
            Some("My First Post")
        );
    }

    #[test]
    fn test_index_of_rejected() {
        let doc = Html::parse_document(
            "<html><head><title>Index of /wp-content/uploads</title></head></html>",
        );
        // The slug fallback still produces something usable from the URL.
        assert_eq!(
            extract_title(&doc, ARCHIVE).as_deref(),
            Some("My First Post")
        );
    }
}
