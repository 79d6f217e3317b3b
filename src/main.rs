use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wayback_press::cdx::{self, CdxClient};
use wayback_press::config::Config;
use wayback_press::export::WxrExporter;
use wayback_press::extract::ContentExtractor;
use wayback_press::group::group_snapshots;
use wayback_press::progress::{Progress, ProgressUpdate};
use wayback_press::rules;
use wayback_press::urls::bare_domain;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let Some(domain_arg) = std::env::args().nth(1) else {
        bail!("usage: wayback-press <domain>");
    };
    let domain = bare_domain(&domain_arg);
    if domain.is_empty() {
        bail!("could not derive a domain from '{domain_arg}'");
    }

    info!(domain = %domain, "Starting wayback-press");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Progress events stream to the log while workers run.
    let (progress, mut progress_rx) = Progress::channel();
    let progress_drain = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            if let ProgressUpdate::Failed { url, reason } = update {
                warn!(url = %url, reason = %reason, "Page failed");
            }
        }
    });

    // Ctrl-C requests a cooperative stop; in-flight requests finish first.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop requested, winding down after the current page");
            signal_cancel.cancel();
        }
    });

    // Discovery
    let cdx_client = CdxClient::new(&config);
    let snapshots = cdx_client
        .fetch_all_snapshots(&domain, &progress)
        .await
        .context("Snapshot discovery failed")?;
    if snapshots.is_empty() {
        bail!("no archived snapshots found for {domain}");
    }

    if let Some((min_month, max_month)) = cdx::month_range(&snapshots) {
        info!(from = %min_month, to = %max_month, "Archive range");
    }
    let snapshots = cdx::filter_by_month_range(
        snapshots,
        config.from_month.as_deref(),
        config.to_month.as_deref(),
    );
    info!(count = snapshots.len(), "Snapshots selected");

    // Grouping and classification
    let inventory = group_snapshots(&snapshots, &progress);
    let selected = inventory.select_blog_posts();
    info!(
        pages = selected.len(),
        records = inventory.record_count(),
        "Blog posts selected for extraction"
    );
    if selected.is_empty() {
        bail!("no blog posts found for {domain}");
    }

    // Extraction
    let rule_store = rules::shared_rules();
    let detection_cache = rules::shared_detection_cache();
    let extractor = ContentExtractor::new(
        config.clone(),
        rule_store,
        detection_cache,
        cancel.clone(),
        progress.clone(),
    );
    let mut outcome = extractor.extract_batch(&selected).await;

    if outcome.extracted.is_empty() {
        bail!(
            "extraction produced no content ({} pages failed)",
            outcome.failed.len()
        );
    }
    for failed in &outcome.failed {
        warn!(url = %failed.url, reason = %failed.reason, "Not exported");
    }

    // Consolidate the taxonomy, then export.
    wayback_press::taxonomy::consolidate::consolidate(&mut outcome.extracted);

    let safe_domain = domain.replace(['/', '.'], "_");
    let base_path = config.output_dir.join(format!("{safe_domain}_wordpress.xml"));
    let exporter = WxrExporter::new(domain.clone());
    let written = exporter
        .export(&outcome.extracted, &base_path, config.items_per_file)
        .await
        .context("WXR export failed")?;

    info!(
        posts = outcome.extracted.len(),
        failed = outcome.failed.len(),
        files = written.len(),
        "Export complete"
    );
    for path in &written {
        info!(path = %path.display(), "Wrote");
    }

    // Both sender handles must drop before the drain task can finish.
    drop(extractor);
    drop(progress);
    let _ = progress_drain.await;

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wayback_press=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
