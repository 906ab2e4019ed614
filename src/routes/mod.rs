use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    state::AppState,
};

pub mod auth;
pub mod chat;
pub mod recsys;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat::chat))
        .merge(auth_routes())
        .nest("/recsys", recsys_routes())
        // Layers run bottom-up: the request id must exist before the trace span
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/auth/google", post(auth::google_auth))
        .route("/auth/github", get(auth::github_auth))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/me", get(auth::me))
        .route("/me/preferences", put(auth::update_preferences))
}

fn recsys_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scrape-events", post(recsys::scrape_events))
        .route("/update-events", post(recsys::update_events))
        .route("/recommend-events", get(recsys::recommend_events))
        .route("/get-event-link", get(recsys::get_event_link))
        .route(
            "/events",
            get(recsys::list_events).post(recsys::create_events),
        )
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
