use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Event, EventDraft},
    services::DEFAULT_TOP_N,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ScrapeQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub user_preferences: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

#[derive(Debug, Deserialize)]
pub struct EventLinkQuery {
    pub event_name: String,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub message: String,
    pub events: Vec<Event>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Event>,
}

#[derive(Debug, Serialize)]
pub struct EventLinkResponse {
    pub link: String,
}

/// Scrape events from a page and append them to the catalog
pub async fn scrape_events(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<ScrapeQuery>,
) -> AppResult<Json<EventsResponse>> {
    let source = state.event_source.name();
    tracing::info!(request_id = %request_id, source, url = %query.url, "Scraping events");

    let events = state.event_source.fetch_events(&query.url).await?;
    state.catalog.append(events.clone()).await;

    Ok(Json(EventsResponse {
        message: format!("Scraped {} events", events.len()),
        events,
    }))
}

/// Rewrite every catalogued description through the enrichment backends
pub async fn update_events(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<EventsResponse>> {
    tracing::info!(request_id = %request_id, "Enriching catalog");

    let events = state.enrichment.enrich_catalog(&state.catalog).await?;

    Ok(Json(EventsResponse {
        message: "Events updated with AI".to_string(),
        events,
    }))
}

/// Rank catalogued events against the user's preferences
pub async fn recommend_events(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<RecommendQuery>,
) -> AppResult<Json<RecommendResponse>> {
    if query.top_n == 0 {
        return Err(AppError::InvalidInput(
            "top_n must be at least 1".to_string(),
        ));
    }

    let events = state.catalog.snapshot().await;
    let recommendations =
        state
            .recommender
            .recommend(&query.user_preferences, &events, query.top_n);

    tracing::info!(
        request_id = %request_id,
        catalog_size = events.len(),
        returned = recommendations.len(),
        "Recommended events"
    );

    Ok(Json(RecommendResponse { recommendations }))
}

/// Enrollment link for an event, matched by name ignoring case
pub async fn get_event_link(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventLinkQuery>,
) -> AppResult<Json<EventLinkResponse>> {
    state
        .catalog
        .find_by_name(&query.event_name)
        .await
        .map(|event| Json(EventLinkResponse { link: event.link }))
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

/// List the catalog in insertion order
pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<Event>> {
    Json(state.catalog.snapshot().await)
}

/// Manually insert events
pub async fn create_events(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(drafts): Json<Vec<EventDraft>>,
) -> AppResult<(StatusCode, Json<EventsResponse>)> {
    let events = drafts
        .into_iter()
        .map(Event::try_from)
        .collect::<AppResult<Vec<Event>>>()?;

    state.catalog.append(events.clone()).await;

    tracing::info!(request_id = %request_id, events_count = events.len(), "Inserted events");

    Ok((
        StatusCode::CREATED,
        Json(EventsResponse {
            message: format!("Added {} events", events.len()),
            events,
        }),
    ))
}
