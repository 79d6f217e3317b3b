//! Shared constants used across the application.

/// User agent string used for archival HTTP requests.
///
/// This is a realistic browser user agent that is indistinguishable from a real browser,
/// making archival requests appear as normal browser traffic.
pub const ARCHIVAL_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// CDX snapshot index query endpoint.
pub const CDX_API_URL: &str = "https://web.archive.org/cdx/search/cdx";

/// Base URL for fetching an archived capture (`{base}/<timestamp>/<original-url>`).
pub const ARCHIVE_WEB_URL: &str = "https://web.archive.org/web";

/// Maximum number of CDX rows requested per discovery run.
pub const SNAPSHOT_ROW_LIMIT: usize = 100_000;

/// Archived responses smaller than this are treated as error pages.
pub const MIN_RESPONSE_BYTES: usize = 1000;

/// Minimum serialized length for extracted main content.
pub const MIN_CONTENT_CHARS: usize = 200;
