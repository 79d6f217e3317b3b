//! Category and tag inference.
//!
//! Explicit selector rules are resolved per URL with a fixed precedence, then
//! applied against the parsed page; automatic detection fills the gaps when
//! enabled. The precedence order (including the domain-scope suppression
//! clause) is preserved exactly as the product defines it.

pub mod consolidate;
pub mod detect;

use scraper::{ElementRef, Html, Selector};

use crate::config::Config;
use crate::rules::{DetectionCache, RuleStore, SelectorMode};
use crate::text::title_case;

/// Where one mode's terms come from for a given URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeRules {
    /// Apply the URL-scoped selector list.
    UrlSelectors(Vec<String>),
    /// Use previously detected terms verbatim.
    Cached(Vec<String>),
    /// Apply domain/global selector lists (possibly empty).
    Selectors(Vec<String>),
}

/// Fully resolved rule state for one page, safe to carry across await points.
#[derive(Debug, Clone)]
pub struct ResolvedRules {
    pub categories: ModeRules,
    pub tags: ModeRules,
    pub auto_categories: bool,
    pub auto_tags: bool,
}

/// Resolve the applicable rules for `url`.
///
/// Precedence per mode: URL-scoped selectors, then a cached detection result,
/// then domain-scoped selectors (consulted only when automatic detection is
/// globally disabled or no global rule exists), then global selectors.
#[must_use]
pub fn resolve_rules(
    store: &RuleStore,
    cache: &DetectionCache,
    url: &str,
    config: &Config,
) -> ResolvedRules {
    ResolvedRules {
        categories: resolve_mode(
            store,
            cache,
            url,
            SelectorMode::Category,
            config.auto_detect_categories,
        ),
        tags: resolve_mode(store, cache, url, SelectorMode::Tag, config.auto_detect_tags),
        auto_categories: config.auto_detect_categories,
        auto_tags: config.auto_detect_tags,
    }
}

fn resolve_mode(
    store: &RuleStore,
    cache: &DetectionCache,
    url: &str,
    mode: SelectorMode,
    auto_enabled: bool,
) -> ModeRules {
    let url_selectors = store.url_selectors(url, mode);
    if !url_selectors.is_empty() {
        return ModeRules::UrlSelectors(url_selectors.to_vec());
    }

    if let Some(terms) = cache.get(url) {
        let cached = match mode {
            SelectorMode::Category => &terms.categories,
            SelectorMode::Tag => &terms.tags,
        };
        if !cached.is_empty() {
            return ModeRules::Cached(cached.clone());
        }
    }

    let global = store.global_selectors(mode);
    let mut selectors = Vec::new();
    // Domain rules lose to a global rule while auto-detection is on.
    if !auto_enabled || global.is_empty() {
        selectors.extend_from_slice(store.domain_selectors(&crate::urls::bare_domain(url), mode));
    }
    selectors.extend_from_slice(global);
    ModeRules::Selectors(selectors)
}

/// Apply the resolved rules to a parsed page.
///
/// Returns `(categories, tags)`. When a mode's explicit rules produce nothing
/// and automatic detection is on, the detection cascade supplies the values.
#[must_use]
pub fn extract_categories_and_tags(
    doc: &Html,
    page_url: &str,
    resolved: &ResolvedRules,
) -> (Vec<String>, Vec<String>) {
    let mut categories = apply_mode(doc, &resolved.categories);
    if categories.is_empty() && resolved.auto_categories {
        categories = detect::detect_categories(doc, page_url);
    }

    let mut tags = apply_mode(doc, &resolved.tags);
    if tags.is_empty() && resolved.auto_tags {
        tags = detect::detect_tags(doc);
    }

    (categories, tags)
}

fn apply_mode(doc: &Html, rules: &ModeRules) -> Vec<String> {
    match rules {
        ModeRules::UrlSelectors(selectors) | ModeRules::Selectors(selectors) => {
            apply_selectors(doc, selectors)
        }
        ModeRules::Cached(terms) => terms.clone(),
    }
}

/// Collect terms from explicit CSS selectors: nested anchor texts when
/// present, the element's own text otherwise.
#[must_use]
pub fn apply_selectors(doc: &Html, selectors: &[String]) -> Vec<String> {
    let anchor = Selector::parse("a").expect("valid selector");
    let mut terms: Vec<String> = Vec::new();

    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            tracing::warn!(selector = %raw, "Skipping unparseable selector rule");
            continue;
        };
        for element in doc.select(&selector) {
            let anchors: Vec<ElementRef<'_>> = element.select(&anchor).collect();
            if anchors.is_empty() {
                push_term(&mut terms, &element_text(element));
            } else {
                for a in anchors {
                    push_term(&mut terms, &element_text(a));
                }
            }
        }
    }
    terms
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn push_term(terms: &mut Vec<String>, text: &str) {
    if text.len() > 1 {
        let cased = title_case(text);
        if !terms.contains(&cased) {
            terms.push(cased);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::DetectedTerms;

    fn page() -> Html {
        Html::parse_document(
            r#"<html><body>
               <div class="cat"><a href="/c/rust">rust</a></div>
               <div class="category"><a href="/c/general">general</a></div>
               <span class="plain">Standalone Term</span>
               </body></html>"#,
        )
    }

    fn config_with_auto(auto: bool) -> Config {
        Config {
            auto_detect_categories: auto,
            auto_detect_tags: auto,
            ..Config::for_testing()
        }
    }

    #[test]
    fn test_url_rule_beats_global() {
        let mut store = RuleStore::default();
        store.set_global(SelectorMode::Category, vec![".category".to_string()]);
        store.set_url(
            "http://ex.com/a",
            SelectorMode::Category,
            vec![".cat".to_string()],
        );
        let cache = DetectionCache::default();
        let resolved = resolve_rules(&store, &cache, "http://ex.com/a", &config_with_auto(true));

        let (categories, _tags) =
            extract_categories_and_tags(&page(), "http://ex.com/a", &resolved);
        assert_eq!(categories, vec!["Rust".to_string()]);
    }

    #[test]
    fn test_cache_beats_domain_and_global() {
        let mut store = RuleStore::default();
        store.set_global(SelectorMode::Category, vec![".category".to_string()]);
        let mut cache = DetectionCache::default();
        cache.insert(
            "http://ex.com/a",
            DetectedTerms {
                categories: vec!["Cached Category".to_string()],
                tags: vec![],
            },
        );
        let resolved = resolve_rules(&store, &cache, "http://ex.com/a", &config_with_auto(true));
        assert_eq!(
            resolved.categories,
            ModeRules::Cached(vec!["Cached Category".to_string()])
        );
    }

    #[test]
    fn test_domain_suppressed_when_auto_on_and_global_exists() {
        let mut store = RuleStore::default();
        store.set_global(SelectorMode::Category, vec![".category".to_string()]);
        store.set_domain("ex.com", SelectorMode::Category, vec![".cat".to_string()]);
        let cache = DetectionCache::default();

        let resolved = resolve_rules(&store, &cache, "http://ex.com/a", &config_with_auto(true));
        assert_eq!(
            resolved.categories,
            ModeRules::Selectors(vec![".category".to_string()])
        );

        // Auto-detection off: domain rules come back, ahead of global.
        let resolved = resolve_rules(&store, &cache, "http://ex.com/a", &config_with_auto(false));
        assert_eq!(
            resolved.categories,
            ModeRules::Selectors(vec![".cat".to_string(), ".category".to_string()])
        );
    }

    #[test]
    fn test_selector_collects_own_text_without_anchors() {
        let terms = apply_selectors(&page(), &[".plain".to_string()]);
        assert_eq!(terms, vec!["Standalone Term".to_string()]);
    }

    #[test]
    fn test_invalid_selector_skipped() {
        let terms = apply_selectors(&page(), &["][bad".to_string(), ".cat".to_string()]);
        assert_eq!(terms, vec!["Rust".to_string()]);
    }
}
