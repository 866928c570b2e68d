//! Cron-driven catalog refresh
//!
//! Sleeps until the next cron tick, rebuilds the catalog through
//! [`CatalogService::rebuild`], and reacts to events sent over
//! [`SchedulerHandle`] in between.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::errors::{AppError, AppResult};
use crate::services::CatalogService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    RefreshNow,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl SchedulerHandle {
    pub fn refresh_now(&self) -> bool {
        self.tx.send(SchedulerEvent::RefreshNow).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.tx.send(SchedulerEvent::Shutdown).is_ok()
    }
}

pub struct RefreshScheduler {
    schedule: Schedule,
    service: Arc<CatalogService>,
    event_rx: mpsc::UnboundedReceiver<SchedulerEvent>,
}

impl RefreshScheduler {
    pub fn new(expression: &str, service: Arc<CatalogService>) -> AppResult<(Self, SchedulerHandle)> {
        let schedule = parse_schedule(expression)?;
        let (tx, event_rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                schedule,
                service,
                event_rx,
            },
            SchedulerHandle { tx },
        ))
    }

    pub fn next_run_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Run until a `Shutdown` event arrives or every handle is dropped
    pub async fn start(mut self) {
        info!("Starting catalog refresh scheduler");

        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                warn!("Refresh schedule has no upcoming runs, stopping scheduler");
                return;
            };
            debug!("Next catalog refresh at {}", next);
            let wake = instant_for(next);

            tokio::select! {
                _ = sleep_until(wake) => {
                    trace!("Scheduler wake-up for catalog refresh");
                    self.refresh().await;
                }
                event = self.event_rx.recv() => match event {
                    Some(SchedulerEvent::RefreshNow) => self.refresh().await,
                    Some(SchedulerEvent::Shutdown) | None => {
                        info!("Catalog refresh scheduler stopped");
                        return;
                    }
                },
            }
        }
    }

    async fn refresh(&self) {
        match self.service.rebuild().await {
            Ok(summary) => info!(
                "Scheduled refresh complete: {} channels (generation {})",
                summary.channels, summary.generation
            ),
            Err(AppError::OperationInProgress { .. }) => {
                debug!("Skipping scheduled refresh, a rebuild is already running");
            }
            Err(e) => error!("Scheduled catalog refresh failed: {}", e),
        }
    }
}

/// Parse a cron expression, accepting the five-field form by prefixing seconds
pub fn parse_schedule(expression: &str) -> AppResult<Schedule> {
    let trimmed = expression.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| {
        AppError::configuration(format!("Invalid refresh schedule '{expression}': {e}"))
    })
}

fn instant_for(at: DateTime<Utc>) -> Instant {
    let delay = (at - Utc::now()).to_std().unwrap_or_default();
    Instant::now() + delay
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogStore;
    use crate::config::{CatalogConfig, FetchConfig};
    use crate::errors::TransportError;
    use crate::ingestor::Aggregator;
    use crate::models::{SourceConfig, SourceType};
    use crate::sources::{PlaylistTransport, RequestOptions, SourceFetcher};
    use crate::utils::retry::RetryConfig;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::time::Duration;

    struct StaticTransport;

    #[async_trait]
    impl PlaylistTransport for StaticTransport {
        async fn get_text(
            &self,
            _url: &str,
            _options: &RequestOptions,
        ) -> Result<String, TransportError> {
            Ok("#EXTM3U\n#EXTINF:-1,News\nhttp://example.com/news\n".to_string())
        }
    }

    #[test]
    fn test_parse_schedule_forms() {
        assert!(parse_schedule("0 0 */6 * * *").is_ok());
        assert!(parse_schedule("*/15 * * * *").is_ok());
        assert!(matches!(
            parse_schedule("every tuesday"),
            Err(AppError::Configuration { .. })
        ));
    }

    #[test]
    fn test_next_run_after() {
        let service = Arc::new(CatalogService::new(
            CatalogStore::default(),
            Aggregator::new(
                SourceFetcher::new(Arc::new(StaticTransport), &FetchConfig::default()),
                1,
            ),
            Vec::new(),
            &CatalogConfig::default(),
        ));
        let (scheduler, _handle) = RefreshScheduler::new("0 30 * * * *", service).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 5, 1, 10, 45, 0).unwrap();
        assert_eq!(
            scheduler.next_run_after(after),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 11, 30, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_refresh_now_and_shutdown() {
        let fetcher = SourceFetcher::new(Arc::new(StaticTransport), &FetchConfig::default())
            .with_retry_config(RetryConfig::immediate(1));
        let store = CatalogStore::default();
        let service = Arc::new(CatalogService::new(
            store.clone(),
            Aggregator::new(fetcher, 1),
            vec![SourceConfig::new("a", "http://example.com/a.m3u", SourceType::Iptv)],
            &CatalogConfig::default(),
        ));
        let (scheduler, handle) = RefreshScheduler::new("0 0 0 1 1 *", service).unwrap();
        let task = tokio::spawn(scheduler.start());

        assert!(handle.refresh_now());
        assert!(handle.shutdown());
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.current().len(), 1);
    }
}
