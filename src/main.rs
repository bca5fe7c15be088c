use anyhow::Context;
use slack_directory::config::load_settings;
use slack_directory::directory::{DirectoryCache, Refresher, SnapshotStores};
use slack_directory::logging::{init_tracing, log_error};
use slack_directory::query::{ChannelQuery, ChannelSort, DirectoryQuery};
use slack_directory::slack::{DirectoryService, SlackDirectory};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize rustls crypto provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // Load configuration; a failure here is reported by the returned error
    let settings = load_settings().context("failed to load configuration")?;
    init_tracing(settings.logging.json);

    tracing::info!("Starting Slack directory");
    tracing::debug!(
        users_cache = %settings.cache.users_path.display(),
        channels_cache = %settings.cache.channels_path.display(),
        emoji_cache = %settings.cache.emoji_path.display(),
        "Snapshot paths"
    );

    let service: Arc<dyn DirectoryService> = Arc::new(
        SlackDirectory::new(&settings.slack).context("failed to create Slack client")?,
    );
    let cache = Arc::new(DirectoryCache::new());

    let refresher = Refresher::new(
        service.clone(),
        cache.clone(),
        SnapshotStores::from_config(&settings.cache),
        &settings.rate_limit,
        settings.options.clone(),
    );

    // Refresh is bounded by the configured timeout and by shutdown signals
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        let timeout = settings.options.refresh_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!(timeout_secs = timeout.as_secs(), "Directory refresh timed out");
                }
                signal_name = setup_shutdown_handler() => {
                    tracing::info!(signal = %signal_name, "Shutdown requested during refresh");
                }
            }
            cancel.cancel();
        });
    }

    let reports = match refresher.warm_up(&cancel).await {
        Ok(reports) => reports,
        Err(e) => {
            log_error("warm_up", &e);
            if e.is_fatal_at_startup() {
                return Err(e).context("directory warm-up failed");
            }
            Vec::new()
        }
    };
    // Release the refresh watcher
    cancel.cancel();

    for report in &reports {
        tracing::info!(
            entity = %report.entity,
            source = ?report.source,
            count = report.count,
            pages = report.pages,
            completed_at = %report.completed_at,
            "Directory loaded"
        );
    }
    cache.log_stats().await;

    let query = DirectoryQuery::new(cache.clone(), settings.paging);
    let popular = query
        .list_channels(&ChannelQuery {
            sort: ChannelSort::Popularity,
            limit: Some(5),
            ..Default::default()
        })
        .await?;
    tracing::info!(
        total_channels = popular.total_matching,
        top = ?popular.items.iter().map(|c| c.display_name.as_str()).collect::<Vec<_>>(),
        "Directory ready to serve"
    );

    let signal_name = setup_shutdown_handler().await;
    tracing::info!(signal = %signal_name, "Received shutdown signal, exiting");
    cache.log_stats().await;

    Ok(())
}

/// Resolve with the name of the first shutdown signal
///
/// Used twice: during warm-up it cancels the in-flight refresh, afterwards it
/// ends the serving loop so final cache statistics are logged before exit.
async fn setup_shutdown_handler() -> String {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        let mut sigquit = signal(SignalKind::quit()).expect("Failed to setup SIGQUIT handler");

        tokio::select! {
            _ = sigint.recv() => {
                tracing::debug!("Caught SIGINT signal");
                "SIGINT (Ctrl+C)".to_string()
            }
            _ = sigterm.recv() => {
                tracing::debug!("Caught SIGTERM signal");
                "SIGTERM".to_string()
            }
            _ = sigquit.recv() => {
                tracing::debug!("Caught SIGQUIT signal");
                "SIGQUIT".to_string()
            }
        }
    }

    #[cfg(not(unix))]
    {
        // On Windows, only handle Ctrl+C
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        tracing::debug!("Caught Ctrl+C signal");
        "Ctrl+C".to_string()
    }
}
