//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::game::room::valid_room_name;
use crate::game::ArenaSnapshot;
use crate::util::time::uptime_secs;
use crate::ws::{ws_handler, ws_room_handler};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/ws/:room", get(ws_room_handler))
        .route("/rooms/:room", get(room_snapshot_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for `CLIENT_ORIGIN`: `*` allows any origin, otherwise a comma-separated list
fn cors_layer(client_origin: &str) -> CorsLayer {
    if client_origin.trim() == "*" {
        return CorsLayer::permissive();
    }

    let allowed_origins: Vec<header::HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    rooms: usize,
    participants: usize,
    connections: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        rooms: state.rooms.active_rooms(),
        participants: state.rooms.total_participants(),
        connections: state.rooms.total_connections(),
    })
}

// ============================================================================
// Room endpoints
// ============================================================================

async fn room_snapshot_handler(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<ArenaSnapshot>, AppError> {
    if !valid_room_name(&room) {
        return Err(AppError::BadRequest(format!("invalid room name: {room}")));
    }

    let room = state
        .rooms
        .get(&room)
        .ok_or_else(|| AppError::NotFound(format!("room {room}")))?;

    Ok(Json(room.snapshot()))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashMap;

    fn test_state() -> AppState {
        let vars: HashMap<&str, &str> = [("ARENA_SEED", "3")].into_iter().collect();
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        AppState::new(config)
    }

    #[tokio::test]
    async fn test_health_counts() {
        let state = test_state();
        let room = state.rooms.join("lobby").unwrap();
        room.register("abc").unwrap();

        let Json(health) = health_handler(State(state.clone())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.rooms, 1);
        assert_eq!(health.participants, 1);
        assert_eq!(health.connections, 1);
    }

    #[tokio::test]
    async fn test_room_snapshot_lookup() {
        let state = test_state();
        let room = state.rooms.join("lobby").unwrap();
        room.register("abc").unwrap();

        let Json(snapshot) = room_snapshot_handler(State(state.clone()), Path("lobby".into()))
            .await
            .unwrap();
        assert_eq!(snapshot.count, 1);

        let missing = room_snapshot_handler(State(state.clone()), Path("nowhere".into())).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let invalid = room_snapshot_handler(State(state), Path("../x".into())).await;
        assert!(matches!(invalid, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_error_status_codes() {
        let response = AppError::NotFound("room".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = AppError::BadRequest("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
