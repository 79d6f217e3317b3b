//! Selector rules supplied by the element-picking collaborator, plus the
//! cache of automatically detected categories and tags.
//!
//! Rule state is a plain value object owned by the shell and shared with the
//! extraction worker behind an `RwLock`: the picker is the single writer and
//! readers are blocked only during mutation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// What a selector rule extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorMode {
    Category,
    Tag,
}

/// How broadly a selector rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorScope {
    Global,
    Domain,
    Url,
}

/// Categories and tags detected for one URL by the automatic pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedTerms {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl DetectedTerms {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.tags.is_empty()
    }
}

/// In-memory store of selector rules, keyed by scope.
///
/// Saving replaces the whole list for a (scope key, mode) pair; there is at
/// most one active list per pair.
#[derive(Debug, Default)]
pub struct RuleStore {
    global: HashMap<SelectorMode, Vec<String>>,
    domain: HashMap<String, HashMap<SelectorMode, Vec<String>>>,
    url: HashMap<String, HashMap<SelectorMode, Vec<String>>>,
}

impl RuleStore {
    /// Replace the global selector list for a mode.
    pub fn set_global(&mut self, mode: SelectorMode, selectors: Vec<String>) {
        self.global.insert(mode, selectors);
    }

    /// Replace the selector list for a domain and mode. Domains are stored
    /// without `www.`, lowercased, port included.
    pub fn set_domain(&mut self, domain: &str, mode: SelectorMode, selectors: Vec<String>) {
        self.domain
            .entry(normalize_scope_domain(domain))
            .or_default()
            .insert(mode, selectors);
    }

    /// Replace the selector list for one exact URL and mode.
    pub fn set_url(&mut self, url: &str, mode: SelectorMode, selectors: Vec<String>) {
        self.url
            .entry(url.to_string())
            .or_default()
            .insert(mode, selectors);
    }

    #[must_use]
    pub fn global_selectors(&self, mode: SelectorMode) -> &[String] {
        self.global.get(&mode).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn domain_selectors(&self, domain: &str, mode: SelectorMode) -> &[String] {
        self.domain
            .get(&normalize_scope_domain(domain))
            .and_then(|modes| modes.get(&mode))
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn url_selectors(&self, url: &str, mode: SelectorMode) -> &[String] {
        self.url
            .get(url)
            .and_then(|modes| modes.get(&mode))
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn has_global(&self, mode: SelectorMode) -> bool {
        !self.global_selectors(mode).is_empty()
    }

    #[must_use]
    pub fn has_url_rule(&self, url: &str, mode: SelectorMode) -> bool {
        !self.url_selectors(url, mode).is_empty()
    }
}

fn normalize_scope_domain(domain: &str) -> String {
    let lower = domain.to_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

/// Cache of automatic detection results, keyed by URL.
#[derive(Debug, Default)]
pub struct DetectionCache {
    entries: HashMap<String, DetectedTerms>,
}

impl DetectionCache {
    pub fn insert(&mut self, url: &str, terms: DetectedTerms) {
        self.entries.insert(url.to_string(), terms);
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<&DetectedTerms> {
        self.entries.get(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rule state shared between the shell and the extraction worker.
pub type SharedRules = Arc<RwLock<RuleStore>>;

/// Detection cache shared between the detection pass and extraction.
pub type SharedDetectionCache = Arc<RwLock<DetectionCache>>;

/// Fresh, empty shared rule state.
#[must_use]
pub fn shared_rules() -> SharedRules {
    Arc::new(RwLock::new(RuleStore::default()))
}

/// Fresh, empty shared detection cache.
#[must_use]
pub fn shared_detection_cache() -> SharedDetectionCache {
    Arc::new(RwLock::new(DetectionCache::default()))
}
