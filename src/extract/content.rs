//! Main-content extraction.
//!
//! Works on a mutable document: chrome elements are detached from the tree
//! before the container cascade runs, mirroring the way the page is cleaned
//! once and then served to the later extractors.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::constants::ARCHIVE_WEB_URL;
use crate::extract::media::split_archive_url;

/// Page chrome stripped from the whole document before anything else.
static GLOBAL_STRIP: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, nav, header, footer, aside, form, noscript, iframe")
        .expect("valid selector")
});

/// Non-content elements removed from a candidate container.
static CONTAINER_STRIP: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "script, style, nav, aside, form, noscript, iframe, \
         .sidebar, .widget, .advertisement, .ads, .social-share, .related-posts, .comments",
    )
    .expect("valid selector")
});

/// Extra chrome removed when falling back to the whole `<body>`.
static BODY_STRIP: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "script, style, nav, header, footer, aside, form, noscript, iframe, \
         ul.menu, div.sidebar, .sidebar, .menu, .navigation, .widget, \
         .advertisement, .ads, .social-share, .related-posts, .comments",
    )
    .expect("valid selector")
});

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));

static IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src="([^"]+)""#).expect("valid src pattern"));

/// Candidate content containers, most specific first.
static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        ".post-content",
        ".entry-content",
        ".content",
        ".main-content",
        "#content",
        ".article-content",
        r#"div[itemprop="articleBody"]"#,
        r#"div[role="main"]"#,
        "#main",
        "#primary",
        "#singular-content",
        ".post-body",
        ".post-text",
        ".post-entry",
        ".entry-body",
        ".article-body",
        ".story-content",
        ".post-detail",
        ".content-area",
        "main",
        ".main",
        ".container",
        ".wrapper",
        ".page-content",
        ".blog-content",
        ".news-content",
        ".text-content",
        ".post",
        ".entry",
        ".article",
        ".story",
        ".content-wrapper",
        ".content-container",
        ".content-box",
        ".post-wrapper",
        ".entry-wrapper",
        ".article-wrapper",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

/// Serialized length a container must exceed to be accepted.
const MIN_CONTAINER_CHARS: usize = 300;

/// Lower threshold for the body fallback.
const MIN_BODY_CHARS: usize = 200;

/// Minimum text length for paragraphs in the last-resort fallback.
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Extract the page's main content as HTML.
///
/// Tries the container cascade, then a cleaned `<body>`, then a synthetic
/// concatenation of all substantial paragraphs. Image URLs in the result are
/// rewritten to archive replay URLs. Returns `None` when nothing usable
/// remains.
#[must_use]
pub fn extract_main_content(doc: &mut Html, archive_url: &str) -> Option<String> {
    detach_matching(doc, &GLOBAL_STRIP);

    for selector in CONTAINER_SELECTORS.iter() {
        if let Some(html) =
            extract_container(doc, selector, &CONTAINER_STRIP, MIN_CONTAINER_CHARS)
        {
            return Some(rewrite_image_urls(&html, archive_url));
        }
    }

    // Fallback: the whole body, minus chrome.
    if let Some(html) = extract_container(doc, &BODY, &BODY_STRIP, MIN_BODY_CHARS) {
        return Some(rewrite_image_urls(&html, archive_url));
    }

    // Last resort: rebuild from bare paragraphs.
    let parts: Vec<String> = doc
        .select(&PARAGRAPH)
        .filter_map(|p| {
            let text = p.text().collect::<String>().trim().to_string();
            (text.len() > MIN_PARAGRAPH_CHARS).then(|| format!("<p>{text}</p>"))
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}

/// Detach every element in the document matching `selector`.
fn detach_matching(doc: &mut Html, selector: &Selector) {
    let ids: Vec<_> = doc.select(selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Serialize the first `container` match after detaching `strip` descendants,
/// when the result clears `min_chars`.
fn extract_container(
    doc: &mut Html,
    container: &Selector,
    strip: &Selector,
    min_chars: usize,
) -> Option<String> {
    let container_id = doc.select(container).next().map(|el| el.id())?;

    let strip_ids: Vec<_> = doc
        .tree
        .get(container_id)
        .and_then(ElementRef::wrap)
        .map(|el| el.select(strip).map(|e| e.id()).collect::<Vec<_>>())
        .unwrap_or_default();
    for id in strip_ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }

    let html = doc
        .tree
        .get(container_id)
        .and_then(ElementRef::wrap)
        .map(|el| el.html())?;
    (html.len() > min_chars).then_some(html)
}

/// Rewrite `<img src>` URLs in serialized HTML to archive replay URLs.
///
/// Relative sources are resolved against the archived page's original URL
/// first; anything already pointing at the archive is left alone.
#[must_use]
pub fn rewrite_image_urls(html: &str, archive_url: &str) -> String {
    let Some((timestamp, original_url)) = split_archive_url(archive_url) else {
        return html.to_string();
    };
    let base = Url::parse(original_url).ok();

    IMG_SRC
        .replace_all(html, |caps: &Captures<'_>| {
            let src = &caps[1];
            if src.starts_with(ARCHIVE_WEB_URL) || src.starts_with("data:") {
                return format!(r#"src="{src}""#);
            }
            let absolute = if src.starts_with("http") {
                src.to_string()
            } else {
                base.as_ref()
                    .and_then(|b| b.join(src).ok())
                    .map_or_else(|| src.to_string(), |joined| joined.to_string())
            };
            format!(r#"src="{ARCHIVE_WEB_URL}/{timestamp}/{absolute}""#)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCHIVE: &str = "https://web.archive.org/web/20200101000000/http://ex.com/2020/05/post";

    fn long_text(len: usize) -> String {
        "lorem ipsum dolor sit amet ".repeat(len / 27 + 1)[..len].to_string()
    }

    #[test]
    fn test_container_cascade_picks_article() {
        let body_text = long_text(400);
        let html = format!(
            r#"<html><body>
               <nav>menu menu menu</nav>
               <article><p>{body_text}</p></article>
               <footer>site footer</footer>
               </body></html>"#
        );
        let mut doc = Html::parse_document(&html);
        let content = extract_main_content(&mut doc, ARCHIVE).unwrap();
        assert!(content.starts_with("<article>"));
        assert!(content.contains("lorem ipsum"));
        assert!(!content.contains("menu menu"));
        assert!(!content.contains("site footer"));
    }

    #[test]
    fn test_container_strips_widgets() {
        let body_text = long_text(400);
        let html = format!(
            r#"<html><body><div class="entry-content">
               <div class="widget">widget junk</div>
               <p>{body_text}</p>
               </div></body></html>"#
        );
        let mut doc = Html::parse_document(&html);
        let content = extract_main_content(&mut doc, ARCHIVE).unwrap();
        assert!(!content.contains("widget junk"));
        assert!(content.contains("lorem ipsum"));
    }

    #[test]
    fn test_body_fallback() {
        let body_text = long_text(250);
        let html = format!("<html><body><div><span>{body_text}</span></div></body></html>");
        let mut doc = Html::parse_document(&html);
        let content = extract_main_content(&mut doc, ARCHIVE).unwrap();
        assert!(content.contains("lorem ipsum"));
    }

    #[test]
    fn test_paragraph_fallback() {
        // Body serialization stays under its threshold, so the synthetic
        // paragraph markup must carry the result.
        let html =
            r#"<html><body><p>This paragraph is long enough to keep.</p><p>no</p></body></html>"#;
        let mut doc = Html::parse_document(html);
        let content = extract_main_content(&mut doc, ARCHIVE).unwrap();
        assert!(content.contains("<p>This paragraph is long enough to keep.</p>"));
        assert!(!content.contains("<p>no</p>"));
    }

    #[test]
    fn test_empty_page_yields_none() {
        let mut doc = Html::parse_document("<html><body></body></html>");
        assert_eq!(extract_main_content(&mut doc, ARCHIVE), None);
    }

    #[test]
    fn test_rewrite_image_urls() {
        let html = r#"<img src="/img/a.jpg"><img src="http://other.com/b.png"><img src="https://web.archive.org/web/20200101000000/http://ex.com/c.gif">"#;
        let rewritten = rewrite_image_urls(html, ARCHIVE);
        assert!(rewritten.contains(
            r#"src="https://web.archive.org/web/20200101000000/http://ex.com/img/a.jpg""#
        ));
        assert!(rewritten.contains(
            r#"src="https://web.archive.org/web/20200101000000/http://other.com/b.png""#
        ));
        assert!(rewritten.contains(
            r#"src="https://web.archive.org/web/20200101000000/http://ex.com/c.gif""#
        ));
    }
}
