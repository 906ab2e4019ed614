use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::json;

use crate::{
    db::EventCatalog,
    error::{AppError, AppResult},
    models::{ChatMessage, Event},
    services::{
        chat::{ChatModel, SYSTEM_PROMPT},
        http::ensure_success,
    },
};

/// Rewrites event descriptions using a generative text backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DescriptionEnricher: Send + Sync {
    /// Returns an improved description for `event`
    async fn enrich(&self, event: &Event) -> AppResult<String>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}

fn enrichment_prompt(description: &str) -> String {
    format!(
        "Enhance this sports event description with more details, category, and appeal: {}",
        description
    )
}

/// Gemini `generateContent` client
pub struct GeminiEnricher {
    http_client: ClientWithMiddleware,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiEnricher {
    pub fn new(
        http_client: ClientWithMiddleware,
        api_url: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl DescriptionEnricher for GeminiEnricher {
    async fn enrich(&self, event: &Event) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": enrichment_prompt(&event.description) }] }]
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let response = ensure_success("Gemini", response).await?;
        let generated: GenerateContentResponse = response.json().await?;

        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ExternalApi(
                "Gemini returned no text".to_string(),
            ));
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Enriches descriptions through a chat model, used as a local fallback
pub struct ChatModelEnricher {
    model: Arc<dyn ChatModel>,
}

impl ChatModelEnricher {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait::async_trait]
impl DescriptionEnricher for ChatModelEnricher {
    async fn enrich(&self, event: &Event) -> AppResult<String> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(enrichment_prompt(&event.description)),
        ];
        self.model.complete(&messages).await
    }

    fn name(&self) -> &'static str {
        self.model.name()
    }
}

/// Runs the enrichment pass over the catalog
///
/// Each event is tried against the enrichers in order. An event that no
/// enricher can rewrite keeps its current description, so the pass never
/// drops or reorders events.
pub struct EnrichmentService {
    enrichers: Vec<Arc<dyn DescriptionEnricher>>,
    concurrency: usize,
}

impl EnrichmentService {
    pub fn new(enrichers: Vec<Arc<dyn DescriptionEnricher>>, concurrency: usize) -> Self {
        Self {
            enrichers,
            concurrency: concurrency.max(1),
        }
    }

    /// Returns `event` with a rewritten description, or unchanged if every
    /// enricher failed
    pub async fn enrich_event(&self, event: Event) -> Event {
        for enricher in &self.enrichers {
            match enricher.enrich(&event).await {
                Ok(description) => return event.with_description(description),
                Err(e) => {
                    tracing::warn!(
                        enricher = enricher.name(),
                        event = %event.name,
                        error = %e,
                        "Enrichment failed, trying next"
                    );
                }
            }
        }
        event
    }

    /// Rewrites every catalogued description and returns the new catalog
    ///
    /// Holds the catalog's mutation lock for the whole pass so concurrent
    /// appends land after the write-back instead of being overwritten.
    pub async fn enrich_catalog(&self, catalog: &EventCatalog) -> AppResult<Vec<Event>> {
        let mut update = catalog.begin_update().await;
        let events = update.snapshot().await;
        let total = events.len();

        let enriched: Vec<Event> = stream::iter(events)
            .map(|event| self.enrich_event(event))
            .buffered(self.concurrency)
            .collect()
            .await;

        update.replace_all(enriched.clone()).await?;

        tracing::info!(events_count = total, "Catalog enriched");

        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, description: &str) -> Event {
        Event {
            name: name.to_string(),
            date: "TBD".to_string(),
            location: "Unknown".to_string(),
            description: description.to_string(),
            link: String::new(),
            category: "sports".to_string(),
        }
    }

    #[test]
    fn test_enrichment_prompt_embeds_description() {
        let prompt = enrichment_prompt("5k fun run");
        assert!(prompt.ends_with(": 5k fun run"));
    }

    #[tokio::test]
    async fn test_enrich_event_uses_first_successful_enricher() {
        let mut primary = MockDescriptionEnricher::new();
        primary
            .expect_enrich()
            .returning(|_| Err(AppError::ExternalApi("quota".to_string())));
        primary.expect_name().return_const("primary");

        let mut fallback = MockDescriptionEnricher::new();
        fallback
            .expect_enrich()
            .returning(|e| Ok(format!("{} with scenic views", e.description)));

        let service = EnrichmentService::new(vec![Arc::new(primary), Arc::new(fallback)], 2);
        let enriched = service.enrich_event(event("A", "5k fun run")).await;
        assert_eq!(enriched.description, "5k fun run with scenic views");
        assert_eq!(enriched.name, "A");
    }

    #[tokio::test]
    async fn test_enrich_catalog_keeps_failed_entries() {
        let catalog = EventCatalog::new();
        catalog
            .append(vec![event("A", "trail run"), event("B", "chess night"), event("C", "swim")])
            .await;

        let mut enricher = MockDescriptionEnricher::new();
        enricher.expect_enrich().returning(|e| {
            if e.name == "B" {
                Err(AppError::ExternalApi("blocked".to_string()))
            } else {
                Ok(format!("Enhanced: {}", e.description))
            }
        });
        enricher.expect_name().return_const("mock");

        let service = EnrichmentService::new(vec![Arc::new(enricher)], 3);
        let enriched = service.enrich_catalog(&catalog).await.unwrap();

        let descriptions: Vec<String> = catalog
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(
            descriptions,
            vec!["Enhanced: trail run", "chess night", "Enhanced: swim"]
        );
        assert_eq!(enriched.len(), 3);
    }

    #[tokio::test]
    async fn test_enrich_empty_catalog() {
        let catalog = EventCatalog::new();
        let service = EnrichmentService::new(Vec::new(), 4);
        assert!(service.enrich_catalog(&catalog).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_model_enricher_delegates() {
        let mut model = crate::services::chat::MockChatModel::new();
        model
            .expect_complete()
            .withf(|messages| messages[1].content.contains("sunrise yoga"))
            .returning(|_| Ok("Sunrise yoga on the beach for all levels".to_string()));

        let enricher = ChatModelEnricher::new(Arc::new(model));
        let description = enricher.enrich(&event("Yoga", "sunrise yoga")).await.unwrap();
        assert_eq!(description, "Sunrise yoga on the beach for all levels");
    }
}
