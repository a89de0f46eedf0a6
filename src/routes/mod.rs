use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;
use crate::websocket::handlers::ws_handler;

pub mod conversations;
use conversations::{
    create_conversation, delete_conversation, get_conversation, list_conversations, mark_as_read,
};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/:id",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/conversations/:id/read", post(mark_as_read))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .nest("/api", api)
        .layer(cors_layer(&state.config))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allowed_origin == "*" {
        return CorsLayer::permissive();
    }
    match config.cors_allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!(
                origin = %config.cors_allowed_origin,
                "invalid CORS_ALLOWED_ORIGIN, falling back to permissive"
            );
            CorsLayer::permissive()
        }
    }
}
