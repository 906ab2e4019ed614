//! HTML event scraper
//!
//! Pages are expected to list each event as a `div.event` block:
//!
//! ```html
//! <div class="event">
//!   <h2>City Marathon</h2>
//!   <span class="date">2025-11-12</span>
//!   <span class="location">Central Park</span>
//!   <p class="desc">Annual 42k road race</p>
//!   <a href="https://example.com/register">Register</a>
//! </div>
//! ```
//!
//! Missing parts fall back to placeholders; a missing link falls back to the
//! page URL.

use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use scraper::{ElementRef, Html, Selector};

use crate::{
    error::{AppError, AppResult},
    models::{Event, DEFAULT_CATEGORY, NO_DESCRIPTION},
};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Source of scraped events
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Fetches and parses every event listed at `url`
    async fn fetch_events(&self, url: &str) -> AppResult<Vec<Event>>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Compiled selectors for one event block
struct EventSelectors {
    event: Selector,
    name: Selector,
    date: Selector,
    location: Selector,
    description: Selector,
    link: Selector,
}

impl EventSelectors {
    fn new() -> AppResult<Self> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| AppError::Internal(format!("Invalid selector '{}': {}", css, e)))
        };

        Ok(Self {
            event: parse("div.event")?,
            name: parse("h2")?,
            date: parse("span.date")?,
            location: parse("span.location")?,
            description: parse("p.desc")?,
            link: parse("a[href]")?,
        })
    }
}

pub struct HtmlEventScraper {
    http_client: ClientWithMiddleware,
    selectors: EventSelectors,
}

impl HtmlEventScraper {
    pub fn new(http_client: ClientWithMiddleware) -> AppResult<Self> {
        Ok(Self {
            http_client,
            selectors: EventSelectors::new()?,
        })
    }

    /// Extracts events from an HTML page served at `page_url`
    pub fn parse_events(&self, html: &str, page_url: &str) -> Vec<Event> {
        let document = Html::parse_document(html);

        document
            .select(&self.selectors.event)
            .map(|block| Event {
                name: first_text(block, &self.selectors.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                date: first_text(block, &self.selectors.date).unwrap_or_else(|| "TBD".to_string()),
                location: first_text(block, &self.selectors.location)
                    .unwrap_or_else(|| "Unknown".to_string()),
                description: first_text(block, &self.selectors.description)
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                link: block
                    .select(&self.selectors.link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string)
                    .unwrap_or_else(|| page_url.to_string()),
                category: DEFAULT_CATEGORY.to_string(),
            })
            .collect()
    }
}

fn first_text(block: ElementRef<'_>, selector: &Selector) -> Option<String> {
    block
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

#[async_trait::async_trait]
impl EventSource for HtmlEventScraper {
    #[tracing::instrument(skip(self))]
    async fn fetch_events(&self, url: &str) -> AppResult<Vec<Event>> {
        let response = self
            .http_client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "text/html")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApi(format!(
                "Scraping {} failed with status {}",
                url, status
            )));
        }

        let html = response.text().await?;
        let events = self.parse_events(&html, url);

        tracing::info!(url = %url, events_count = events.len(), "Scraped events");

        Ok(events)
    }

    fn name(&self) -> &'static str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{http::StatusCode, routing::get, Router};

    use super::*;
    use crate::services::http::retrying_client;

    const PAGE_URL: &str = "https://events.example.com/list";

    #[test]
    fn test_parse_complete_event() {
        let scraper = HtmlEventScraper::new(retrying_client(0)).unwrap();
        let html = r#"
            <html><body>
              <div class="event">
                <h2> City Marathon </h2>
                <span class="date">2025-11-12</span>
                <span class="location">Central Park</span>
                <p class="desc">Annual road race</p>
                <a href="https://events.example.com/marathon">Register</a>
              </div>
            </body></html>
        "#;

        let events = scraper.parse_events(html, PAGE_URL);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.name, "City Marathon");
        assert_eq!(event.date, "2025-11-12");
        assert_eq!(event.location, "Central Park");
        assert_eq!(event.description, "Annual road race");
        assert_eq!(event.link, "https://events.example.com/marathon");
        assert_eq!(event.category, "sports");
    }

    #[test]
    fn test_parse_defaults_missing_parts() {
        let scraper = HtmlEventScraper::new(retrying_client(0)).unwrap();
        let html = r#"<div class="event"><span>nothing useful</span></div>"#;

        let events = scraper.parse_events(html, PAGE_URL);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.name, "Unknown");
        assert_eq!(event.date, "TBD");
        assert_eq!(event.location, "Unknown");
        assert_eq!(event.description, NO_DESCRIPTION);
        assert_eq!(event.link, PAGE_URL);
    }

    #[test]
    fn test_parse_keeps_page_order() {
        let scraper = HtmlEventScraper::new(retrying_client(0)).unwrap();
        let html = r#"
            <div class="event"><h2>River Runners</h2></div>
            <div class="other"><h2>Not an event</h2></div>
            <div class="event"><h2>Trail Club</h2></div>
        "#;

        let names: Vec<String> = scraper
            .parse_events(html, PAGE_URL)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["River Runners", "Trail Club"]);
    }

    #[test]
    fn test_parse_page_without_events() {
        let scraper = HtmlEventScraper::new(retrying_client(0)).unwrap();
        assert!(scraper.parse_events("<p>Closed</p>", PAGE_URL).is_empty());
    }

    /// Serves 503 for the first `failures` requests, then a one-event page
    async fn flaky_page(failures: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/events",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < failures {
                        (StatusCode::SERVICE_UNAVAILABLE, String::new())
                    } else {
                        (
                            StatusCode::OK,
                            r#"<div class="event"><h2>Night Ride</h2></div>"#.to_string(),
                        )
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/events", addr), hits)
    }

    #[tokio::test]
    async fn test_fetch_retries_transient_failure() {
        let (url, hits) = flaky_page(1).await;
        let scraper = HtmlEventScraper::new(retrying_client(2)).unwrap();

        let events = scraper.fetch_events(&url).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Night Ride");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_reports_exhausted_retries() {
        let (url, hits) = flaky_page(usize::MAX).await;
        let scraper = HtmlEventScraper::new(retrying_client(0)).unwrap();

        let result = scraper.fetch_events(&url).await;

        assert!(matches!(result, Err(AppError::ExternalApi(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
