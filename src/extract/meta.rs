//! Meta-description and publication-date helpers.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));

/// Extract the page's meta description, empty when absent.
#[must_use]
pub fn extract_meta_description(doc: &Html) -> String {
    doc.select(&META_DESCRIPTION)
        .find_map(|el| el.value().attr("content"))
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// Derive a publication date from a capture timestamp.
///
/// `YYYYMMDDHHMMSS` becomes `YYYY-MM-DD HH:MM:SS`; unparseable input is
/// passed through untouched.
#[must_use]
pub fn publication_date(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, "%Y%m%d%H%M%S").map_or_else(
        |_| timestamp.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_description() {
        let doc = Html::parse_document(
            r#"<html><head><meta name="description" content=" A page. "></head></html>"#,
        );
        assert_eq!(extract_meta_description(&doc), "A page.");
    }

    #[test]
    fn test_meta_description_missing() {
        let doc = Html::parse_document("<html><head></head></html>");
        assert_eq!(extract_meta_description(&doc), "");
    }

    #[test]
    fn test_publication_date() {
        assert_eq!(publication_date("20200517093000"), "2020-05-17 09:30:00");
        assert_eq!(publication_date("garbage"), "garbage");
    }
}
