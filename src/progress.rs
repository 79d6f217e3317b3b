//! One-way progress notifications from pipeline workers to the shell.
//!
//! Workers run sequentially and report through an unbounded channel; the
//! orchestrating side drains events at its own pace. Every event is also
//! mirrored to `tracing` so headless runs keep a useful log.

use tokio::sync::mpsc;
use tracing::info;

use crate::extract::ExtractedContent;

/// A progress event emitted by a long-running operation.
#[derive(Debug)]
pub enum ProgressUpdate {
    /// Free-form status message.
    Message(String),
    /// One page was extracted successfully.
    Extracted(Box<ExtractedContent>),
    /// One page exhausted all snapshots and attempts.
    Failed { url: String, reason: String },
    /// A batch finished.
    Finished { extracted: usize, failed: usize },
}

/// Handle used by workers to emit progress events.
///
/// A detached handle (no channel) still logs via `tracing`, which keeps
/// library functions usable without a listening shell.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    sender: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl Progress {
    /// Create a progress handle plus the receiving end for the shell.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }

    /// Progress handle that only logs.
    #[must_use]
    pub fn detached() -> Self {
        Self { sender: None }
    }

    /// Emit a status message.
    pub fn message(&self, text: impl Into<String>) {
        let text = text.into();
        info!("{text}");
        self.send(ProgressUpdate::Message(text));
    }

    /// Report a successfully extracted page.
    pub fn extracted(&self, content: ExtractedContent) {
        info!(url = %content.url, title = %content.title, "Extracted");
        self.send(ProgressUpdate::Extracted(Box::new(content)));
    }

    /// Report a page that failed after exhausting its snapshot history.
    pub fn failed(&self, url: impl Into<String>, reason: impl Into<String>) {
        let url = url.into();
        let reason = reason.into();
        info!(url = %url, reason = %reason, "Extraction failed");
        self.send(ProgressUpdate::Failed { url, reason });
    }

    /// Report batch completion.
    pub fn finished(&self, extracted: usize, failed: usize) {
        info!(extracted, failed, "Batch finished");
        self.send(ProgressUpdate::Finished { extracted, failed });
    }

    fn send(&self, update: ProgressUpdate) {
        if let Some(sender) = &self.sender {
            // A dropped receiver just means nobody is listening anymore.
            let _ = sender.send(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivers_messages() {
        let (progress, mut rx) = Progress::channel();
        progress.message("connecting");
        progress.finished(3, 1);

        match rx.recv().await.unwrap() {
            ProgressUpdate::Message(text) => assert_eq!(text, "connecting"),
            other => panic!("unexpected update: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            ProgressUpdate::Finished { extracted, failed } => {
                assert_eq!(extracted, 3);
                assert_eq!(failed, 1);
            }
            other => panic!("unexpected update: {other:?}"),
        }
    }

    #[test]
    fn test_detached_does_not_panic() {
        let progress = Progress::detached();
        progress.message("no listener");
        progress.failed("http://example.com/a", "timeout");
    }
}
