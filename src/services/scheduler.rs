use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::state::AppState;

/// Shortest allowed gap between refreshes
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Handle for stopping the catalog refresh job
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the job to stop and waits for an in-flight refresh to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Catalog refresh task panicked");
        }
        tracing::info!("Scheduler shut down");
    }
}

/// Starts the periodic catalog refresh
///
/// The first refresh runs one full `period` after startup. Periods shorter
/// than a second are raised to one second.
pub fn spawn_catalog_refresh(state: Arc<AppState>, period: Duration) -> SchedulerHandle {
    let period = period.max(MIN_PERIOD);
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        tracing::info!(period_secs = period.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => refresh_catalog(&state).await,
                _ = shutdown_rx.recv() => break,
            }
        }
    });

    SchedulerHandle { shutdown_tx, task }
}

/// Scrapes every configured source, then enriches the whole catalog
///
/// A failing source is logged and skipped; a failing enrichment pass leaves
/// the catalog as scraped.
pub async fn refresh_catalog(state: &AppState) {
    let source = state.event_source.name();
    tracing::info!(source, "Starting automatic event update");

    for url in &state.config.scrape_sources {
        match state.event_source.fetch_events(url).await {
            Ok(events) => {
                let count = events.len();
                state.catalog.append(events).await;
                tracing::info!(
                    source,
                    url = %url,
                    events_count = count,
                    "Scraped events from source"
                );
            }
            Err(e) => {
                tracing::error!(
                    source,
                    url = %url,
                    error = %e,
                    "Error scraping source"
                );
            }
        }
    }

    if let Err(e) = state.enrichment.enrich_catalog(&state.catalog).await {
        tracing::error!(error = %e, "Error updating events");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config, error::AppError, models::Event, services::scraper::MockEventSource,
    };

    fn event(name: &str) -> Event {
        Event {
            name: name.to_string(),
            date: "TBD".to_string(),
            location: "Unknown".to_string(),
            description: "group run".to_string(),
            link: String::new(),
            category: "sports".to_string(),
        }
    }

    #[tokio::test]
    async fn test_refresh_names_source_and_skips_failures() {
        let mut source = MockEventSource::new();
        source.expect_name().times(1).return_const("mock");
        source
            .expect_fetch_events()
            .times(2)
            .returning(|url: &str| {
                if url.ends_with("/up") {
                    Ok(vec![event("Morning Run")])
                } else {
                    Err(AppError::ExternalApi("down".to_string()))
                }
            });

        let config = Config {
            scrape_sources: vec![
                "https://events.example.com/down".to_string(),
                "https://events.example.com/up".to_string(),
            ],
            ..Config::default()
        };
        let state = AppState::with_collaborators(config, Arc::new(source), vec![], vec![]);

        refresh_catalog(&state).await;

        let names: Vec<String> = state
            .catalog
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Morning Run"]);
    }
}
