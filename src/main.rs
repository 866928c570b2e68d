use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_aggregator::{
    catalog::CatalogStore,
    config::Config,
    ingestor::{Aggregator, RefreshScheduler},
    services::{CatalogService, StreamValidator, ValidationService},
    sources::{HttpTransport, SourceFetcher},
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "m3u-aggregator")]
#[command(version)]
#[command(about = "Aggregates public M3U playlists into a deduplicated channel catalog")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Catalog snapshot path (overrides config file)
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Disable background stream validation
    #[arg(long)]
    no_validation: bool,

    /// Fetch all sources, write the snapshot and exit
    #[arg(long)]
    build_snapshot: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("m3u_aggregator={},tower_http=trace", cli.log_level)
    } else {
        format!("m3u_aggregator={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting M3U Aggregator v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(snapshot) = cli.snapshot {
        config.catalog.snapshot_path = Some(snapshot);
    }
    if cli.no_validation {
        config.validation.enabled = false;
    }
    let config = Arc::new(config);

    let sources = config.enabled_sources();
    if sources.is_empty() {
        warn!("No enabled sources configured in {}", cli.config);
    }
    info!("{} playlist source(s) enabled", sources.len());

    let transport = Arc::new(HttpTransport::new(
        &config.fetch.user_agent,
        config.fetch.connect_timeout,
    )?);
    let fetcher = SourceFetcher::new(transport, &config.fetch);
    let aggregator = Aggregator::new(fetcher, config.fetch.concurrency);
    let store = CatalogStore::default();
    let catalog_service = Arc::new(CatalogService::new(
        store.clone(),
        aggregator,
        sources,
        &config.catalog,
    ));

    if cli.build_snapshot {
        if config.catalog.snapshot_path.is_none() {
            bail!("--build-snapshot requires catalog.snapshot_path or --snapshot");
        }
        let summary = catalog_service.rebuild().await.map_err(|e| {
            error!("Snapshot build failed: {}", e);
            e
        })?;
        info!(
            "Snapshot built: {} channels from {} source(s), {} failed",
            summary.channels, summary.successful_sources, summary.failed_sources
        );
        return Ok(());
    }

    let origin = catalog_service
        .bootstrap()
        .await
        .context("No catalog could be built from sources or snapshot")?;
    info!(
        "Catalog ready from {:?}: {} channels",
        origin,
        store.current().len()
    );

    let validation = if config.validation.enabled {
        let probe_transport = Arc::new(HttpTransport::new(
            &config.validation.user_agent,
            config.fetch.connect_timeout,
        )?);
        let validator = Arc::new(StreamValidator::new(probe_transport, &config.validation));
        let service = Arc::new(ValidationService::new(
            validator,
            store.clone(),
            &config.validation,
        ));
        if config.validation.start_on_boot {
            info!("Starting stream validation: {:?}", service.start());
        }
        Some(service)
    } else {
        info!("Stream validation disabled");
        None
    };

    let scheduler = match &config.catalog.refresh_schedule {
        Some(expression) => {
            let (scheduler, handle) = RefreshScheduler::new(expression, catalog_service.clone())?;
            tokio::spawn(scheduler.start());
            info!("Catalog refresh scheduled: {}", expression);
            Some(handle)
        }
        None => None,
    };

    let server = WebServer::new(AppState::new(config.clone(), catalog_service, validation))?;
    info!("Web server starting on {}:{}", server.host(), server.port());
    server.serve().await?;

    if let Some(handle) = scheduler {
        handle.shutdown();
    }
    info!("M3U Aggregator stopped");
    Ok(())
}
