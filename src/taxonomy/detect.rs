//! Automatic category and tag detection.
//!
//! Best-effort cascades over theme conventions: the WordPress defaults first,
//! then scoped fallbacks restricted to article containers, then URL, markup,
//! and keyword heuristics. Later tiers exist for themes that expose nothing
//! machine-readable at all.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::group::UrlRecord;
use crate::progress::Progress;
use crate::rules::{DetectedTerms, SharedDetectionCache};
use crate::text::title_case;

static CAT_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".cat-links a").expect("valid selector"));

static TAGS_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".tags-links a").expect("valid selector"));

/// Category fallbacks, restricted to article/post/entry containers so that
/// sidebar and widget taxonomy lists stay out of the result.
static CATEGORY_FALLBACKS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article .category a",
        "article .categories a",
        ".post .category a",
        ".post .categories a",
        ".entry .category a",
        ".entry .categories a",
        ".article .category a",
        ".article .categories a",
        ".content .category a",
        ".content .categories a",
        ".post-content .category a",
        ".post-content .categories a",
        ".entry-content .category a",
        ".entry-content .categories a",
        ".article-content .category a",
        ".article-content .categories a",
        ".post-meta .category",
        ".entry-meta .category",
        ".article-meta .category",
        ".post-info .category",
        ".entry-info .category",
        ".article-info .category",
        "article .breadcrumb a",
        "article .breadcrumbs a",
        ".post .breadcrumb a",
        ".post .breadcrumbs a",
        ".entry .breadcrumb a",
        ".entry .breadcrumbs a",
        ".cat-links a",
        ".entry-categories a",
        ".post-categories a",
        ".category-links a",
        ".post-category",
        ".entry-category",
        ".article-category",
        r#"[itemprop="articleSection"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

/// Tag fallbacks, same scoping rationale as the category list.
static TAG_FALLBACKS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article .tag a",
        "article .tags a",
        ".post .tag a",
        ".post .tags a",
        ".entry .tag a",
        ".entry .tags a",
        ".article .tag a",
        ".article .tags a",
        ".content .tag a",
        ".content .tags a",
        ".post-content .tag a",
        ".post-content .tags a",
        ".entry-content .tag a",
        ".entry-content .tags a",
        ".article-content .tag a",
        ".article-content .tags a",
        ".post-meta .tag a",
        ".entry-meta .tag a",
        ".article-meta .tag a",
        ".post-footer .tag a",
        ".entry-footer .tag a",
        ".article-footer .tag a",
        r#"article [itemprop="keywords"] a"#,
        r#"article [itemprop="tag"] a"#,
        r#".post [itemprop="keywords"] a"#,
        r#".entry [itemprop="keywords"] a"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static BREADCRUMB_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".breadcrumb",
        ".breadcrumbs",
        ".nav-breadcrumb",
        ".breadcrumb-nav",
        ".breadcrumb-trail",
        r#"[class*="breadcrumb"]"#,
        r#"[class*="crumb"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static META_CATEGORY_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[property="article:section"]"#,
        r#"meta[name="category"]"#,
        r#"meta[property="og:section"]"#,
        r#"meta[name="section"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static META_TAG_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[name="keywords"]"#,
        r#"meta[property="article:tag"]"#,
        r#"meta[name="tags"]"#,
        r#"meta[property="og:tag"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static ARTICLE_TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article h1",
        ".post h1",
        ".entry h1",
        ".article h1",
        "article .title",
        ".post .title",
        ".entry .title",
        ".article .title",
        "article .post-title",
        ".post .post-title",
        ".entry .entry-title",
        ".article .article-title",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static CONTENT_PARAGRAPH_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article p",
        ".post p",
        ".entry p",
        ".article p",
        "article .content p",
        ".post .post-content p",
        ".entry .entry-content p",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static TITLE_TAG: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid pattern"));

/// Path segments that suggest a category-bearing URL, mixed-language.
const PATH_CATEGORY_KEYWORDS: &[&str] = &[
    "category", "kategori", "cat", "section", "bolum", "teknoloji", "technology", "haber",
    "news", "blog", "makale", "yazi", "post",
];

/// Each tag tier contributes at most this many terms.
const MAX_TIER_TAGS: usize = 5;

const TECH_KEYWORDS: &[&str] = &[
    "computer", "tablet", "pc", "laptop", "phone", "mobile", "technology", "bilgisayar",
    "telefon", "teknoloji",
];
const NEWS_KEYWORDS: &[&str] = &["news", "breaking", "sports", "economy", "haber", "gündem"];
const BLOG_KEYWORDS: &[&str] = &["blog", "article", "tutorial", "makale", "yazı", "post"];

/// Detect categories for a page, running the full fallback cascade.
#[must_use]
pub fn detect_categories(doc: &Html, page_url: &str) -> Vec<String> {
    // The WordPress default theme markup is right most of the time.
    let mut categories = collect_texts(doc, &CAT_LINKS, 2, 50);
    if !categories.is_empty() {
        return categories;
    }

    for selector in CATEGORY_FALLBACKS.iter() {
        for el in doc.select(selector) {
            push_unique(&mut categories, el.text().collect::<String>().trim(), 2, 50);
        }
    }
    if !categories.is_empty() {
        return categories;
    }

    categories = categories_from_url_path(page_url);
    if !categories.is_empty() {
        return categories;
    }

    if let Some(crumb) = breadcrumb_category(doc) {
        return vec![crumb];
    }

    for selector in META_CATEGORY_SELECTORS.iter() {
        if let Some(content) = doc.select(selector).find_map(|el| el.value().attr("content")) {
            let text = content.trim();
            if text.len() > 2 && text.len() < 30 {
                return vec![title_case(text)];
            }
        }
    }

    title_keyword_category(doc).map_or_else(Vec::new, |c| vec![c])
}

/// Detect tags for a page.
#[must_use]
pub fn detect_tags(doc: &Html) -> Vec<String> {
    let mut tags = collect_texts(doc, &TAGS_LINKS, 2, 50);
    if !tags.is_empty() {
        tags.truncate(MAX_TIER_TAGS);
        return tags;
    }

    for selector in TAG_FALLBACKS.iter() {
        for el in doc.select(selector) {
            push_unique(&mut tags, el.text().collect::<String>().trim(), 2, 50);
        }
    }
    if !tags.is_empty() {
        tags.truncate(MAX_TIER_TAGS);
        return tags;
    }

    tags = meta_tag_terms(doc);
    if !tags.is_empty() {
        tags.truncate(MAX_TIER_TAGS);
        return tags;
    }

    tags = title_word_tags(doc);
    if !tags.is_empty() {
        return tags;
    }

    first_paragraph_tags(doc)
}

/// Category candidates hidden in the URL path itself.
#[must_use]
pub fn categories_from_url_path(page_url: &str) -> Vec<String> {
    let path = Url::parse(page_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| page_url.to_string());

    for part in path.split('/').filter(|s| !s.is_empty()) {
        let part_lower = part.to_lowercase();
        if PATH_CATEGORY_KEYWORDS
            .iter()
            .any(|kw| part_lower.contains(kw))
            && part.len() > 2
        {
            return vec![title_case(&part.replace(['-', '_'], " "))];
        }
    }
    Vec::new()
}

fn breadcrumb_category(doc: &Html) -> Option<String> {
    for selector in BREADCRUMB_SELECTORS.iter() {
        for breadcrumb in doc.select(selector) {
            let links: Vec<String> = breadcrumb
                .select(&ANCHOR)
                .map(|a| a.text().collect::<String>().trim().to_string())
                .collect();
            // Second link is the category by convention (first is home).
            if links.len() >= 2 {
                let text = &links[1];
                if text.len() > 2 && text.len() < 30 {
                    return Some(title_case(text));
                }
            }
        }
    }
    None
}

fn title_keyword_category(doc: &Html) -> Option<String> {
    let title = doc
        .select(&TITLE_TAG)
        .next()
        .map(|el| el.text().collect::<String>().to_lowercase())?;

    if TECH_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        Some("Technology".to_string())
    } else if NEWS_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        Some("News".to_string())
    } else if BLOG_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        Some("Blog".to_string())
    } else {
        None
    }
}

fn meta_tag_terms(doc: &Html) -> Vec<String> {
    let mut tags = Vec::new();
    for selector in META_TAG_SELECTORS.iter() {
        if let Some(content) = doc.select(selector).find_map(|el| el.value().attr("content")) {
            let parts: Vec<&str> = if content.contains(',') {
                content.split(',').collect()
            } else if content.contains(';') {
                content.split(';').collect()
            } else {
                vec![content]
            };
            for part in parts {
                let term = part.trim();
                if term.len() > 2 && term.len() < 30 {
                    push_unique(&mut tags, term, 2, 30);
                }
            }
        }
    }
    tags
}

fn title_word_tags(doc: &Html) -> Vec<String> {
    // Prefer the post's own heading over the site-wide <title>.
    for selector in ARTICLE_TITLE_SELECTORS.iter() {
        if let Some(el) = doc.select(selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if text.len() > 5 {
                return words_as_tags(&text, 4, 20, 5);
            }
        }
    }

    let Some(title_el) = doc.select(&TITLE_TAG).next() else {
        return Vec::new();
    };
    let mut title = title_el.text().collect::<String>().trim().to_string();
    // Drop the site-name suffix before mining words.
    for sep in [" - ", " | "] {
        if let Some((head, _)) = title.split_once(sep) {
            title = head.to_string();
            break;
        }
    }
    words_as_tags(&title, 4, 20, 3)
}

fn first_paragraph_tags(doc: &Html) -> Vec<String> {
    for selector in CONTENT_PARAGRAPH_SELECTORS.iter() {
        if let Some(p) = doc.select(selector).next() {
            let text = p.text().collect::<String>().trim().to_string();
            if text.len() > 20 {
                return words_as_tags(&text, 5, 15, 3);
            }
        }
    }
    Vec::new()
}

/// Mine up to `cap` distinct words of acceptable length from free text.
fn words_as_tags(text: &str, min_len: usize, max_len: usize, cap: usize) -> Vec<String> {
    let cleaned = NON_WORD.replace_all(text, "");
    let mut tags = Vec::new();
    for word in cleaned.split_whitespace() {
        let folded = fold_turkish(word);
        if folded.len() >= min_len && folded.len() < max_len {
            let cased = title_case(&folded);
            if !tags.contains(&cased) {
                tags.push(cased);
            }
            if tags.len() >= cap {
                break;
            }
        }
    }
    tags
}

/// Fold Turkish letters to their ASCII neighbors for stable tag slugs.
fn fold_turkish(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            'ı' => 'i',
            'ğ' => 'g',
            'ü' => 'u',
            'ş' => 's',
            'ö' => 'o',
            'ç' => 'c',
            'İ' => 'I',
            'Ğ' => 'G',
            'Ü' => 'U',
            'Ş' => 'S',
            'Ö' => 'O',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

fn collect_texts(doc: &Html, selector: &Selector, min_len: usize, max_len: usize) -> Vec<String> {
    let mut terms = Vec::new();
    for el in doc.select(selector) {
        push_unique(&mut terms, el.text().collect::<String>().trim(), min_len, max_len);
    }
    terms
}

fn push_unique(terms: &mut Vec<String>, text: &str, min_len: usize, max_len: usize) {
    if text.len() >= min_len && text.len() < max_len {
        let cased = title_case(text);
        if !terms.contains(&cased) {
            terms.push(cased);
        }
    }
}

/// Run detection against each record's newest capture and fill the cache.
///
/// Network or parse failures skip the record; cancellation stops the pass at
/// the next boundary.
pub async fn auto_detect_batch(
    client: &reqwest::Client,
    records: &[UrlRecord],
    cache: &SharedDetectionCache,
    progress: &Progress,
    cancel: &CancellationToken,
) {
    let total = records.len();
    for (i, record) in records.iter().enumerate() {
        if cancel.is_cancelled() {
            progress.message("Detection cancelled");
            break;
        }
        progress.message(format!("Detecting categories/tags... ({}/{total})", i + 1));

        let Ok(response) = client.get(&record.archive_url).send().await else {
            continue;
        };
        if !response.status().is_success() {
            continue;
        }
        let Ok(body) = response.text().await else {
            continue;
        };

        let terms = detect_terms(&body, &record.original_url);
        if !terms.is_empty() {
            cache.write().await.insert(&record.original_url, terms);
        }
    }
}

/// Parse a page and run both detection cascades (synchronous helper so the
/// non-`Send` DOM never crosses an await point).
fn detect_terms(body: &str, page_url: &str) -> DetectedTerms {
    let doc = Html::parse_document(body);
    DetectedTerms {
        categories: detect_categories(&doc, page_url),
        tags: detect_tags(&doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cat_links_first() {
        let doc = Html::parse_document(
            r#"<html><body><span class="cat-links"><a>rust</a><a>systems</a></span></body></html>"#,
        );
        assert_eq!(
            detect_categories(&doc, "http://ex.com/a"),
            vec!["Rust".to_string(), "Systems".to_string()]
        );
    }

    #[test]
    fn test_scoped_fallback_skips_sidebar() {
        let doc = Html::parse_document(
            r#"<html><body>
               <div class="sidebar"><div class="category"><a>SidebarCat</a></div></div>
               <article><div class="category"><a>Real Category</a></div></article>
               </body></html>"#,
        );
        let categories = detect_categories(&doc, "http://ex.com/a");
        assert_eq!(categories, vec!["Real Category".to_string()]);
    }

    #[test]
    fn test_url_path_categories() {
        assert_eq!(
            categories_from_url_path("http://ex.com/kategori/oyun-haberleri/post"),
            vec!["Kategori".to_string()]
        );
        assert!(categories_from_url_path("http://ex.com/a/b").is_empty());
    }

    #[test]
    fn test_breadcrumb_second_link() {
        let doc = Html::parse_document(
            r#"<html><body><nav class="breadcrumbs">
               <a>Home</a><a>Reviews</a><a>This Post</a>
               </nav></body></html>"#,
        );
        assert_eq!(detect_categories(&doc, "http://ex.com/a"), vec!["Reviews".to_string()]);
    }

    #[test]
    fn test_meta_section() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="article:section" content="Opinion"></head></html>"#,
        );
        assert_eq!(detect_categories(&doc, "http://ex.com/a"), vec!["Opinion".to_string()]);
    }

    #[test]
    fn test_title_keyword_bucket() {
        let doc = Html::parse_document(
            "<html><head><title>best laptop deals this week</title></head></html>",
        );
        assert_eq!(
            detect_categories(&doc, "http://ex.com/a"),
            vec!["Technology".to_string()]
        );
    }

    #[test]
    fn test_detect_tags_meta_keywords() {
        let doc = Html::parse_document(
            r#"<html><head><meta name="keywords" content="rust, async runtime, tokio"></head></html>"#,
        );
        assert_eq!(
            detect_tags(&doc),
            vec![
                "Rust".to_string(),
                "Async Runtime".to_string(),
                "Tokio".to_string()
            ]
        );
    }

    #[test]
    fn test_title_word_mining_cap() {
        let doc = Html::parse_document(
            "<html><body><article><h1>Understanding asynchronous network programming patterns deeply today</h1></article></body></html>",
        );
        let tags = detect_tags(&doc);
        assert!(!tags.is_empty());
        assert!(tags.len() <= 5);
    }

    #[test]
    fn test_fold_turkish() {
        assert_eq!(fold_turkish("yazılım"), "yazilim");
        assert_eq!(fold_turkish("plain"), "plain");
    }

    #[test]
    fn test_nothing_detected() {
        let doc = Html::parse_document("<html><body></body></html>");
        assert!(detect_categories(&doc, "http://ex.com/x/y").is_empty());
        assert!(detect_tags(&doc).is_empty());
    }
}
