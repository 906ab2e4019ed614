use std::sync::Arc;

use crate::{
    config::Config,
    db::{EventCatalog, UserStore},
    error::AppResult,
    services::{
        auth::TokenIssuer, http::retrying_client, ChatModel, ChatModelEnricher, ChatService,
        DescriptionEnricher, EnrichmentService, EventSource, GeminiEnricher, HtmlEventScraper,
        OpenAiChatModel, Recommender,
    },
};

/// Shared application state
///
/// Owns the event catalog and user store for the lifetime of the process;
/// routes and the scheduler receive it as `Arc<AppState>`.
pub struct AppState {
    pub config: Config,
    pub catalog: EventCatalog,
    pub users: UserStore,
    pub tokens: TokenIssuer,
    pub recommender: Recommender,
    pub event_source: Arc<dyn EventSource>,
    pub enrichment: EnrichmentService,
    pub chat: ChatService,
}

impl AppState {
    /// Wires the real scraper and model clients from configuration
    ///
    /// Backends without credentials are skipped: no OpenAI key means chat goes
    /// straight to the local model, no Gemini key means enrichment does too.
    pub fn from_config(config: Config) -> AppResult<Self> {
        let http_client = retrying_client(config.max_retries);

        let mut chat_models: Vec<Arc<dyn ChatModel>> = Vec::new();
        if let Some(key) = &config.openai_api_key {
            chat_models.push(Arc::new(OpenAiChatModel::new(
                http_client.clone(),
                config.openai_api_url.clone(),
                Some(key.clone()),
                config.openai_model.clone(),
                "openai",
            )));
        }

        let local_model: Option<Arc<dyn ChatModel>> = config.local_model_url.as_ref().map(|url| {
            Arc::new(OpenAiChatModel::new(
                http_client.clone(),
                url.clone(),
                None,
                config.local_model_name.clone(),
                "local",
            )) as Arc<dyn ChatModel>
        });
        if let Some(model) = &local_model {
            chat_models.push(model.clone());
        }

        let mut enrichers: Vec<Arc<dyn DescriptionEnricher>> = Vec::new();
        if let Some(key) = &config.gemini_api_key {
            enrichers.push(Arc::new(GeminiEnricher::new(
                http_client.clone(),
                config.gemini_api_url.clone(),
                key.clone(),
                config.gemini_model.clone(),
            )));
        }
        if let Some(model) = local_model {
            enrichers.push(Arc::new(ChatModelEnricher::new(model)));
        }

        tracing::info!(
            chat_backends = chat_models.len(),
            enrichment_backends = enrichers.len(),
            "Configured model backends"
        );

        let event_source = Arc::new(HtmlEventScraper::new(http_client)?);
        Ok(Self::with_collaborators(config, event_source, enrichers, chat_models))
    }

    /// Builds state around the given collaborators
    pub fn with_collaborators(
        config: Config,
        event_source: Arc<dyn EventSource>,
        enrichers: Vec<Arc<dyn DescriptionEnricher>>,
        chat_models: Vec<Arc<dyn ChatModel>>,
    ) -> Self {
        let tokens = match &config.jwt_secret_key {
            Some(secret) => TokenIssuer::new(secret, config.jwt_expiration_hours),
            None => {
                tracing::warn!("JWT_SECRET_KEY not set, using a random per-process secret");
                TokenIssuer::with_random_secret(config.jwt_expiration_hours)
            }
        };
        let enrichment = EnrichmentService::new(enrichers, config.enrichment_concurrency);

        Self {
            catalog: EventCatalog::new(),
            users: UserStore::new(),
            tokens,
            recommender: Recommender::new(),
            event_source,
            enrichment,
            chat: ChatService::new(chat_models),
            config,
        }
    }
}
