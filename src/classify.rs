//! URL-shape classification into content classes.
//!
//! Extension-based classes are unambiguous and checked first; the blog-post
//! heuristic is intentionally permissive (it ends in a catch-all) and must
//! therefore run before the even looser page bucket.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Content class assigned to every non-junk URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageClass {
    BlogPost,
    Page,
    Image,
    Document,
    Other,
}

impl PageClass {
    /// Stable lowercase name, used in logs and bucket labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PageClass::BlogPost => "blog_post",
            PageClass::Page => "page",
            PageClass::Image => "image",
            PageClass::Document => "document",
            PageClass::Other => "other",
        }
    }

    /// All classes in classification priority order.
    #[must_use]
    pub fn all() -> [PageClass; 5] {
        [
            PageClass::Image,
            PageClass::Document,
            PageClass::BlogPost,
            PageClass::Page,
            PageClass::Other,
        ]
    }

    /// Position in classification priority order; lower is more specific.
    #[must_use]
    pub fn rank(self) -> usize {
        Self::all()
            .iter()
            .position(|c| *c == self)
            .unwrap_or(Self::all().len())
    }
}

impl std::fmt::Display for PageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".ico",
];

const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".txt", ".rtf", ".xls", ".xlsx", ".ppt", ".pptx",
];

/// Path segments that mark content pages across common CMSes (plus the
/// Turkish equivalents this tool regularly encounters in archives).
const CONTENT_SEGMENTS: &[&str] = &[
    "/blog/",
    "/post/",
    "/yazi/",
    "/makale/",
    "/haber/",
    "/entry/",
    "/story/",
];

static HTML_LIKE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(html|php|asp|aspx|htm)$").expect("valid extension pattern"));

static DATED_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/\d{4}/\d{2}(/\d{2})?/.+").expect("valid dated-path pattern"));

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+$").expect("valid numeric pattern"));

static PAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/page/",
        r"/sayfa/",
        r"/index",
        r"/home",
        r"^/$",
        r"^/index\.html$",
        r"^/index\.php$",
        r"/kategori/",
        r"/category/",
        r"/etiket/",
        r"/tag/",
        r"/author/",
        r"/yazar/",
        r"/arsiv/",
        r"/archive/",
        r"/search/",
        r"\?s=",
        r"^/\d{4}/\d{2}(/\d{2})?/?$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid page pattern"))
    .collect()
});

/// Classify a URL into exactly one [`PageClass`].
///
/// Total and deterministic: every input maps to one class, with extension
/// checks taking precedence over path heuristics.
#[must_use]
pub fn classify(url: &str) -> PageClass {
    let lower = url.to_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return PageClass::Image;
    }
    if DOCUMENT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return PageClass::Document;
    }

    let path = url_path(&lower);
    if is_blog_post_path(&path) {
        return PageClass::BlogPost;
    }
    if is_page_path(&path) {
        return PageClass::Page;
    }
    PageClass::Other
}

/// Path and query of a lowercased URL, tolerating schemeless input. The
/// query rides along so search-result patterns can match.
fn url_path(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        return match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        };
    }
    match url.split_once('/') {
        Some((_, rest)) => format!("/{rest}"),
        None => "/".to_string(),
    }
}

fn is_blog_post_path(path: &str) -> bool {
    if HTML_LIKE_EXT.is_match(path) {
        return true;
    }
    if DATED_PATH.is_match(path) {
        return true;
    }
    if CONTENT_SEGMENTS.iter().any(|seg| path.contains(seg)) {
        return true;
    }
    // Catch-all: a non-numeric final segment deeper than one level is most
    // likely a slugged post.
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(last) = segments.last() {
        if !NUMERIC_SEGMENT.is_match(last) && segments.len() > 1 {
            return true;
        }
    }
    false
}

fn is_page_path(path: &str) -> bool {
    PAGE_PATTERNS.iter().any(|p| p.is_match(path))
}
