//! Resilient content extraction over a page's snapshot history.
//!
//! Snapshots are tried newest-first with a bounded retry budget per
//! snapshot; the first capture that clears every quality gate wins. A page
//! only fails after its whole history is exhausted, and that failure is a
//! recorded outcome, not an error.

pub mod author;
pub mod content;
pub mod media;
pub mod meta;
pub mod title;

use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cdx::archive_url_for;
use crate::config::Config;
use crate::constants::{ARCHIVAL_USER_AGENT, ARCHIVE_WEB_URL, MIN_CONTENT_CHARS, MIN_RESPONSE_BYTES};
use crate::group::UrlRecord;
use crate::progress::Progress;
use crate::rules::{SharedDetectionCache, SharedRules};
use crate::taxonomy::{self, consolidate, ResolvedRules};

/// Everything extracted from the best snapshot of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    /// Canonical key of the page.
    pub url: String,
    /// Replay URL of the capture that actually succeeded.
    pub archive_url: String,
    /// Timestamp of the capture that actually succeeded.
    pub timestamp: String,
    pub title: String,
    /// Main content as HTML.
    pub content: String,
    pub meta_description: String,
    /// Derived from the capture timestamp.
    pub publication_date: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Archive image URL, empty when the page had no usable image.
    pub featured_image: String,
    pub author: String,
    /// Raw category candidates feeding the bulk consolidation pass.
    pub category_candidates: Vec<String>,
}

/// A page that exhausted its snapshot history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub url: String,
    pub reason: String,
}

/// Terminal outcome for one page.
#[derive(Debug)]
pub enum ExtractionOutcome {
    Extracted(Box<ExtractedContent>),
    /// Cooperative stop; the page is skipped, not failed.
    Cancelled,
    Exhausted {
        last_error: String,
    },
}

/// Result of an extraction batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub extracted: Vec<ExtractedContent>,
    pub failed: Vec<FailedItem>,
}

/// Sequential extraction worker.
pub struct ContentExtractor {
    client: reqwest::Client,
    config: Config,
    rules: SharedRules,
    detection_cache: SharedDetectionCache,
    cancel: CancellationToken,
    progress: Progress,
    archive_base: String,
}

impl ContentExtractor {
    #[must_use]
    pub fn new(
        config: Config,
        rules: SharedRules,
        detection_cache: SharedDetectionCache,
        cancel: CancellationToken,
        progress: Progress,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(ARCHIVAL_USER_AGENT)
            .timeout(config.content_timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            config,
            rules,
            detection_cache,
            cancel,
            progress,
            archive_base: ARCHIVE_WEB_URL.to_string(),
        }
    }

    /// Point capture fetches at a different archive host (tests).
    #[must_use]
    pub fn with_archive_base(mut self, base: impl Into<String>) -> Self {
        self.archive_base = base.into();
        self
    }

    /// Extract every selected page sequentially, pacing requests politely.
    ///
    /// Per-page failures never abort the batch; they are aggregated in the
    /// returned [`BatchOutcome`]. Cancellation winds the batch down after
    /// the page in flight.
    pub async fn extract_batch(&self, selected: &[UrlRecord]) -> BatchOutcome {
        let total = selected.len();
        let mut outcome = BatchOutcome::default();
        self.progress
            .message(format!("Extracting 0/{total} pages..."));

        for (i, record) in selected.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.progress.message("Extraction cancelled");
                break;
            }
            self.progress
                .message(format!("Extracting ({}/{total}): {}", i + 1, record.key));

            match self.extract_single(record).await {
                ExtractionOutcome::Extracted(content) => {
                    self.progress.extracted((*content).clone());
                    outcome.extracted.push(*content);
                }
                ExtractionOutcome::Cancelled => {
                    self.progress.message("Extraction cancelled");
                    break;
                }
                ExtractionOutcome::Exhausted { last_error } => {
                    self.progress.failed(record.key.clone(), last_error.clone());
                    outcome.failed.push(FailedItem {
                        url: record.key.clone(),
                        reason: last_error,
                    });
                }
            }

            if i + 1 < total {
                sleep(self.config.request_delay).await;
            }
        }

        self.progress
            .finished(outcome.extracted.len(), outcome.failed.len());
        outcome
    }

    /// Walk one page's snapshot history newest-first until a capture clears
    /// every gate.
    pub async fn extract_single(&self, record: &UrlRecord) -> ExtractionOutcome {
        let mut archive_dates = if record.all_snapshots.is_empty() {
            vec![record.timestamp.clone()]
        } else {
            record.all_snapshots.clone()
        };
        archive_dates.sort_by(|a, b| b.cmp(a));

        self.progress.message(format!(
            "Trying {} snapshots for {}",
            archive_dates.len(),
            record.key
        ));

        let mut last_error: Option<String> = None;

        for (date_index, timestamp) in archive_dates.iter().enumerate() {
            self.progress
                .message(format!("Trying snapshot {timestamp}"));

            for attempt in 0..self.config.retry_count {
                if self.cancel.is_cancelled() {
                    return ExtractionOutcome::Cancelled;
                }
                self.progress.message(format!(
                    "Attempt {}/{} - snapshot {timestamp}",
                    attempt + 1,
                    self.config.retry_count
                ));

                // Polite pacing before every request except the very first.
                if attempt > 0 || date_index > 0 {
                    sleep(self.config.request_delay).await;
                }

                let fetch_url = self.capture_url(timestamp, &record.original_url);
                debug!(url = %fetch_url, "Fetching capture");

                match self.client.get(&fetch_url).send().await {
                    Ok(response) if response.status().as_u16() == 429 => {
                        self.progress.message(format!(
                            "Rate limited, backing off for {}s...",
                            self.config.rate_limit_backoff.as_secs()
                        ));
                        sleep(self.config.rate_limit_backoff).await;
                    }
                    Ok(response) if response.status().is_success() => {
                        let body = match response.text().await {
                            Ok(body) => body,
                            Err(e) => {
                                last_error = Some(format!("Failed to read body: {e}"));
                                continue;
                            }
                        };
                        if body.len() < MIN_RESPONSE_BYTES {
                            last_error =
                                Some(format!("Response too small ({} bytes)", body.len()));
                            continue;
                        }
                        if self.cancel.is_cancelled() {
                            return ExtractionOutcome::Cancelled;
                        }

                        // Resolve rules up front so the DOM stage stays
                        // synchronous (the parsed tree is not Send).
                        let resolved = {
                            let rules = self.rules.read().await;
                            let cache = self.detection_cache.read().await;
                            taxonomy::resolve_rules(
                                &rules,
                                &cache,
                                &record.original_url,
                                &self.config,
                            )
                        };

                        let archive_url = archive_url_for(timestamp, &record.original_url);
                        match build_content(&body, &archive_url, record, timestamp, &resolved) {
                            Ok(extracted) => {
                                self.progress
                                    .message(format!("Extracted: {}", extracted.title));
                                return ExtractionOutcome::Extracted(Box::new(extracted));
                            }
                            Err(reason) => {
                                last_error = Some(reason);
                            }
                        }
                    }
                    Ok(response) => {
                        last_error = Some(format!("HTTP {}", response.status().as_u16()));
                    }
                    Err(e) if e.is_timeout() => {
                        last_error = Some("Timeout".to_string());
                    }
                    Err(e) if e.is_connect() => {
                        last_error = Some("Connection error".to_string());
                    }
                    Err(e) => {
                        last_error = Some(e.to_string());
                    }
                }
            }
        }

        ExtractionOutcome::Exhausted {
            last_error: last_error.unwrap_or_else(|| "Unknown error".to_string()),
        }
    }

    fn capture_url(&self, timestamp: &str, original_url: &str) -> String {
        format!("{}/{timestamp}/{original_url}", self.archive_base)
    }
}

/// Run the full extraction cascade over one fetched capture.
///
/// Category and tag markup is read before content extraction because content
/// cleanup detaches the very elements that carry it.
fn build_content(
    body: &str,
    archive_url: &str,
    record: &UrlRecord,
    timestamp: &str,
    resolved: &ResolvedRules,
) -> Result<ExtractedContent, String> {
    let mut doc = scraper::Html::parse_document(body);

    let title = title::extract_title(&doc, archive_url)
        .ok_or_else(|| "Could not extract a title".to_string())?;

    let (categories, tags) =
        taxonomy::extract_categories_and_tags(&doc, &record.original_url, resolved);
    let category_candidates =
        consolidate::collect_candidates(&doc, &record.original_url, &title);

    let content = content::extract_main_content(&mut doc, archive_url)
        .ok_or_else(|| "Insufficient content (0 chars)".to_string())?;
    if content.trim().len() < MIN_CONTENT_CHARS {
        return Err(format!(
            "Insufficient content ({} chars)",
            content.trim().len()
        ));
    }

    let meta_description = meta::extract_meta_description(&doc);
    let publication_date = meta::publication_date(timestamp);
    let featured_image = media::extract_featured_image(&doc, archive_url);
    let author = author::extract_author(&doc, &record.original_url);

    Ok(ExtractedContent {
        url: record.key.clone(),
        archive_url: archive_url.to_string(),
        timestamp: timestamp.to_string(),
        title,
        content,
        meta_description,
        publication_date,
        categories,
        tags,
        featured_image,
        author,
        category_candidates,
    })
}
