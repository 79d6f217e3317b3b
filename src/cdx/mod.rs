//! Wayback Machine CDX index client.
//!
//! Fetches the full snapshot history for a domain in one query, with bounded
//! retry and rate-limit backoff. Persistent non-200 responses degrade to an
//! empty result; network failures that outlive the retry budget surface as
//! [`FetchError`].

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::{ARCHIVAL_USER_AGENT, ARCHIVE_WEB_URL, CDX_API_URL};
use crate::progress::Progress;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("archive index not responding (timeout: {0:?})")]
    Timeout(Duration),
    #[error("connection to the archive failed")]
    Connect,
    #[error("archive request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to parse CDX response: {0}")]
    Parse(String),
}

/// One archived capture of a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// 14-digit capture timestamp (`YYYYMMDDHHMMSS`); lexicographic order is
    /// chronological order.
    pub timestamp: String,
    /// The URL as originally crawled, port included.
    pub original_url: String,
    /// Replay URL for this capture.
    pub archive_url: String,
}

impl Snapshot {
    #[must_use]
    pub fn new(timestamp: String, original_url: String) -> Self {
        let archive_url = archive_url_for(&timestamp, &original_url);
        Self {
            timestamp,
            original_url,
            archive_url,
        }
    }
}

/// Build the replay URL for a capture.
#[must_use]
pub fn archive_url_for(timestamp: &str, original_url: &str) -> String {
    format!("{ARCHIVE_WEB_URL}/{timestamp}/{original_url}")
}

/// Client for the archive's CDX snapshot index.
pub struct CdxClient {
    client: reqwest::Client,
    endpoint: String,
    retry_count: u32,
    rate_limit_backoff: Duration,
    api_timeout: Duration,
    snapshot_limit: usize,
}

impl CdxClient {
    /// Create a client against the production CDX endpoint.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_endpoint(config, CDX_API_URL)
    }

    /// Create a client against a custom endpoint (tests).
    #[must_use]
    pub fn with_endpoint(config: &Config, endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(ARCHIVAL_USER_AGENT)
            .timeout(config.api_timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            endpoint: endpoint.into(),
            retry_count: config.retry_count,
            rate_limit_backoff: config.rate_limit_backoff,
            api_timeout: config.api_timeout,
            snapshot_limit: config.snapshot_limit,
        }
    }

    /// Fetch every snapshot the index holds for `domain`.
    ///
    /// Retries up to the configured budget. HTTP 429 backs off and consumes
    /// an attempt; timeouts and connection errors that exhaust the budget are
    /// hard failures; any other persistent non-200 yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the archive cannot be reached within the
    /// retry budget or the response is not valid CDX JSON.
    pub async fn fetch_all_snapshots(
        &self,
        domain: &str,
        progress: &Progress,
    ) -> Result<Vec<Snapshot>, FetchError> {
        progress.message("Connecting to the archive index...");

        let query_url = self.build_query_url(domain);
        debug!(url = %query_url, "Querying CDX index");

        for attempt in 1..=self.retry_count {
            progress.message(format!(
                "Fetching snapshots... (attempt {attempt}/{})",
                self.retry_count
            ));

            match self.client.get(&query_url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::OK {
                        let body = response.text().await.map_err(FetchError::Http)?;
                        return parse_cdx_rows(&body, progress);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        progress.message(format!(
                            "Rate limited, backing off for {}s...",
                            self.rate_limit_backoff.as_secs()
                        ));
                        sleep(self.rate_limit_backoff).await;
                    } else {
                        warn!(status = %status, "CDX index returned an error status");
                        progress.message(format!("HTTP error: {status}"));
                    }
                }
                Err(e) if e.is_timeout() => {
                    progress.message(format!(
                        "Timeout, attempt {attempt}/{} failed",
                        self.retry_count
                    ));
                    if attempt == self.retry_count {
                        return Err(FetchError::Timeout(self.api_timeout));
                    }
                }
                Err(e) if e.is_connect() => {
                    progress.message(format!(
                        "Connection error, attempt {attempt}/{}",
                        self.retry_count
                    ));
                    if attempt == self.retry_count {
                        return Err(FetchError::Connect);
                    }
                }
                Err(e) => {
                    if attempt == self.retry_count {
                        return Err(FetchError::Http(e));
                    }
                }
            }
        }

        // Persistent non-200 is an empty result, not a hard failure.
        warn!("CDX index never returned 200; treating as empty result");
        Ok(Vec::new())
    }

    fn build_query_url(&self, domain: &str) -> String {
        format!(
            "{}?url={}/*&output=json&fl=timestamp,original&limit={}",
            self.endpoint,
            urlencoding::encode(domain),
            self.snapshot_limit
        )
    }
}

/// Parse a CDX JSON body into snapshots, reporting progress every 1000 rows.
fn parse_cdx_rows(body: &str, progress: &Progress) -> Result<Vec<Snapshot>, FetchError> {
    progress.message("Processing index data...");

    let rows: Vec<Vec<String>> =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    // First row is the field-name header.
    let data_rows = match rows.first() {
        Some(header) if header.first().map(String::as_str) == Some("timestamp") => &rows[1..],
        _ => &rows[..],
    };

    let total = data_rows.len();
    let mut snapshots = Vec::with_capacity(total);
    for (i, row) in data_rows.iter().enumerate() {
        if (i + 1) % 1000 == 0 {
            progress.message(format!("Processing snapshots... {}/{total}", i + 1));
        }
        if row.len() >= 2 {
            snapshots.push(Snapshot::new(row[0].clone(), row[1].clone()));
        }
    }

    progress.message(format!("Fetched {} snapshots", snapshots.len()));
    Ok(snapshots)
}

/// Month of a capture timestamp as `YYYY-MM`.
fn timestamp_month(timestamp: &str) -> Option<String> {
    if timestamp.len() >= 6 && timestamp[..6].chars().all(|c| c.is_ascii_digit()) {
        Some(format!("{}-{}", &timestamp[..4], &timestamp[4..6]))
    } else {
        None
    }
}

/// Minimum and maximum capture month across a snapshot list.
#[must_use]
pub fn month_range(snapshots: &[Snapshot]) -> Option<(String, String)> {
    let months: Vec<String> = snapshots
        .iter()
        .filter_map(|s| timestamp_month(&s.timestamp))
        .collect();
    let min = months.iter().min()?.clone();
    let max = months.iter().max()?.clone();
    Some((min, max))
}

/// Keep only snapshots captured within the inclusive `YYYY-MM` bounds.
#[must_use]
pub fn filter_by_month_range(
    snapshots: Vec<Snapshot>,
    from_month: Option<&str>,
    to_month: Option<&str>,
) -> Vec<Snapshot> {
    if from_month.is_none() && to_month.is_none() {
        return snapshots;
    }
    snapshots
        .into_iter()
        .filter(|s| {
            let Some(month) = timestamp_month(&s.timestamp) else {
                return false;
            };
            if let Some(from) = from_month {
                if month.as_str() < from {
                    return false;
                }
            }
            if let Some(to) = to_month {
                if month.as_str() > to {
                    return false;
                }
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(timestamp: &str) -> Snapshot {
        Snapshot::new(timestamp.to_string(), "http://ex.com/a".to_string())
    }

    #[test]
    fn test_archive_url_derivation() {
        let s = Snapshot::new(
            "20200101000000".to_string(),
            "http://example.com/2020/05/my-post".to_string(),
        );
        assert_eq!(
            s.archive_url,
            "https://web.archive.org/web/20200101000000/http://example.com/2020/05/my-post"
        );
    }

    #[test]
    fn test_parse_cdx_rows_skips_header() {
        let body = r#"[["timestamp","original"],["20200101000000","http://example.com/2020/05/my-post"]]"#;
        let snapshots = parse_cdx_rows(body, &Progress::detached()).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].timestamp, "20200101000000");
        assert_eq!(snapshots[0].original_url, "http://example.com/2020/05/my-post");
    }

    #[test]
    fn test_parse_cdx_rows_empty_body() {
        assert!(parse_cdx_rows("[]", &Progress::detached())
            .unwrap()
            .is_empty());
        assert!(parse_cdx_rows(r#"[["timestamp","original"]]"#, &Progress::detached())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_cdx_rows_rejects_non_json() {
        assert!(matches!(
            parse_cdx_rows("<html>503</html>", &Progress::detached()),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_month_range() {
        let snapshots = vec![snap("20200315000000"), snap("20180101120000"), snap("20211231235959")];
        assert_eq!(
            month_range(&snapshots),
            Some(("2018-01".to_string(), "2021-12".to_string()))
        );
        assert_eq!(month_range(&[]), None);
    }

    #[test]
    fn test_filter_by_month_range() {
        let snapshots = vec![snap("20180101000000"), snap("20200601000000"), snap("20211201000000")];
        let filtered =
            filter_by_month_range(snapshots.clone(), Some("2019-01"), Some("2021-01"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].timestamp, "20200601000000");

        let unfiltered = filter_by_month_range(snapshots, None, None);
        assert_eq!(unfiltered.len(), 3);
    }
}
