//! Bulk category consolidation.
//!
//! After extraction, all pages vote on a shared category vocabulary; every
//! page is then reassigned to its best vocabulary entry. The vocabulary is
//! capped at ten entries so the exported taxonomy stays importable no matter
//! how diverse the source site was.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::extract::ExtractedContent;
use crate::taxonomy::detect::categories_from_url_path;
use crate::text::title_case;

/// Upper bound on distinct exported categories.
pub const MAX_CATEGORIES: usize = 10;

/// Label used when a page matches nothing in the vocabulary.
pub const FALLBACK_CATEGORY: &str = "General";

/// Markup that may carry category names anywhere in a page.
static CANDIDATE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"[rel="category tag"]"#,
        r#"[rel="category"]"#,
        r#"[rel="tag"]"#,
        "a.category",
        "a.cat",
        "a.kategori",
        "a[data-category]",
        "span.category",
        "span.cat",
        "span.kategori",
        "span[data-category]",
        "div.category",
        "div.cat",
        "div.kategori",
        "div[data-category]",
        r#"a[href*="/kategori/"]"#,
        r#"a[href*="/category/"]"#,
        ".cat-links a",
        ".entry-categories a",
        ".post-categories a",
        ".category-links a",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static META_CATEGORY_NAMES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[name="category"]"#,
        r#"meta[name="categories"]"#,
        r#"meta[name="kategori"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static TAG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid pattern"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid pattern"));

/// Collect every category candidate a page offers: selector hits, meta tags,
/// URL path segments, and substantial title words.
///
/// Runs during extraction while the DOM is at hand; the result rides on
/// [`ExtractedContent`] into the bulk pass.
#[must_use]
pub fn collect_candidates(doc: &Html, page_url: &str, title: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for selector in CANDIDATE_SELECTORS.iter() {
        for el in doc.select(selector) {
            let text = el.text().collect::<String>().trim().to_string();
            if text.len() > 1 {
                push_unique(&mut candidates, title_case(&text));
            }
        }
    }

    for selector in META_CATEGORY_NAMES.iter() {
        if let Some(content) = doc.select(selector).find_map(|el| el.value().attr("content")) {
            for part in content.split(',') {
                let term = part.trim();
                if term.len() > 2 && term.len() < 30 {
                    push_unique(&mut candidates, title_case(term));
                }
            }
        }
    }

    for category in categories_from_url_path(page_url) {
        push_unique(&mut candidates, category);
    }

    let cleaned = NON_WORD.replace_all(title, "");
    for word in cleaned.split_whitespace() {
        if word.len() > 4 {
            push_unique(&mut candidates, title_case(word));
        }
    }

    candidates
}

/// Consolidate categories across all extracted pages and reassign tags.
///
/// Builds the top-[`MAX_CATEGORIES`] vocabulary by candidate frequency, then
/// gives every page exactly one category from it (or the fallback label when
/// the vocabulary is empty).
pub fn consolidate(contents: &mut [ExtractedContent]) {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for content in contents.iter() {
        for candidate in &content.category_candidates {
            if candidate.len() > 1 {
                *frequency.entry(candidate.as_str()).or_default() += 1;
            }
        }
    }

    let mut ranked: Vec<(&str, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let vocabulary: Vec<String> = ranked
        .into_iter()
        .take(MAX_CATEGORIES)
        .map(|(name, _)| name.to_string())
        .collect();

    for content in contents.iter_mut() {
        let assigned = vocabulary
            .iter()
            .find(|entry| content.category_candidates.contains(entry))
            .or_else(|| vocabulary.first())
            .map_or_else(|| FALLBACK_CATEGORY.to_string(), Clone::clone);
        content.categories = vec![assigned];

        content.tags = mine_tags(content);
    }
}

/// Rebuild a page's tag list from its title, meta description, and the most
/// frequent words of its content, capped at five.
fn mine_tags(content: &ExtractedContent) -> Vec<String> {
    let mut tags = Vec::new();

    for text in [&content.title, &content.meta_description] {
        let cleaned = NON_WORD.replace_all(text, "");
        for word in cleaned.split_whitespace() {
            if word.len() > 3 {
                push_unique(&mut tags, title_case(word));
            }
        }
    }

    // Most frequent content words round the list out.
    let stripped = TAG_STRIP.replace_all(&content.content, " ");
    let cleaned = NON_WORD.replace_all(&stripped, "");
    let mut word_counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for word in cleaned.split_whitespace() {
        if word.len() > 3 && word.len() < 30 {
            let cased = title_case(word);
            if !word_counts.contains_key(&cased) {
                order.push(cased.clone());
            }
            *word_counts.entry(cased).or_default() += 1;
        }
    }
    let mut frequent: Vec<(String, usize)> = order
        .into_iter()
        .map(|w| {
            let count = word_counts[&w];
            (w, count)
        })
        .collect();
    frequent.sort_by(|a, b| b.1.cmp(&a.1));
    for (word, _) in frequent.into_iter().take(5) {
        push_unique(&mut tags, word);
    }

    tags.truncate(5);
    tags
}

fn push_unique(terms: &mut Vec<String>, term: String) {
    if !terms.contains(&term) {
        terms.push(term);
    }
}
