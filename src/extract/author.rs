//! Author extraction cascade.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::text::title_case;
use crate::urls::bare_domain;

static META_AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="author"]"#).expect("valid selector"));

static OG_AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:author"]"#).expect("valid selector"));

static AUTHOR_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".author",
        ".byline",
        ".post-author",
        ".entry-author",
        r#"[rel="author"]"#,
        ".author-name",
        ".writer",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

/// Extract the author, falling back to the site's domain name.
#[must_use]
pub fn extract_author(doc: &Html, page_url: &str) -> String {
    if let Some(author) = meta_content(doc, &META_AUTHOR).or_else(|| meta_content(doc, &OG_AUTHOR))
    {
        return author;
    }

    for selector in AUTHOR_SELECTORS.iter() {
        if let Some(el) = doc.select(selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() && text.len() < 100 {
                return text;
            }
        }
    }

    title_case(&bare_domain(page_url))
}

fn meta_content(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .find_map(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_author_wins() {
        let doc = Html::parse_document(
            r#"<html><head><meta name="author" content="Jane Doe"></head>
               <body><span class="author">Someone Else</span></body></html>"#,
        );
        assert_eq!(extract_author(&doc, "http://ex.com/a"), "Jane Doe");
    }

    #[test]
    fn test_class_selector_fallback() {
        let doc = Html::parse_document(
            r#"<html><body><div class="byline">Sam Writer</div></body></html>"#,
        );
        assert_eq!(extract_author(&doc, "http://ex.com/a"), "Sam Writer");
    }

    #[test]
    fn test_domain_fallback() {
        let doc = Html::parse_document("<html><body><p>no author here</p></body></html>");
        assert_eq!(extract_author(&doc, "http://www.example.com/a"), "Example.com");
    }

    #[test]
    fn test_overlong_byline_rejected() {
        let long = "x".repeat(150);
        let html = format!(r#"<html><body><div class="author">{long}</div></body></html>"#);
        let doc = Html::parse_document(&html);
        assert_eq!(extract_author(&doc, "http://ex.com/a"), "Ex.com");
    }
}
