//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::catalog::{Car, CarId, Track, TrackId};
use crate::race::{ErrorKind, RaceError, RaceId, RaceResults, RaceSummary, RaceView};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::ACCEPT, header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/cars", get(list_cars_handler))
        .route("/tracks", get(list_tracks_handler))
        .route("/races", get(list_races_handler).post(create_race_handler))
        .route("/races/:race_id", get(results_handler))
        .route("/races/:race_id/results", get(results_handler))
        .route("/races/:race_id/start", post(start_race_handler))
        .route("/races/:race_id/accelerate", post(accelerate_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .fallback(not_found_handler)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    races: usize,
    active_races: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        races: state.races.race_count(),
        active_races: state.races.active_races(),
    })
}

// ============================================================================
// Catalog endpoints
// ============================================================================

async fn list_cars_handler(State(state): State<AppState>) -> Json<Vec<Car>> {
    Json(state.races.list_cars().to_vec())
}

async fn list_tracks_handler(State(state): State<AppState>) -> Json<Vec<Track>> {
    Json(state.races.list_tracks().into_iter().cloned().collect())
}

// ============================================================================
// Race endpoints
// ============================================================================

#[derive(Deserialize)]
struct CreateRaceRequest {
    player_id: CarId,
    track_id: TrackId,
}

async fn list_races_handler(State(state): State<AppState>) -> Json<Vec<RaceSummary>> {
    Json(state.races.list_races())
}

async fn create_race_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateRaceRequest>,
) -> Result<Json<RaceView>, AppError> {
    let race = state.races.create_race(req.player_id, req.track_id)?;
    Ok(Json(race.view()))
}

async fn results_handler(
    State(state): State<AppState>,
    Path(race_id): Path<String>,
) -> Result<Json<RaceResults>, AppError> {
    let race_id = parse_race_id(&race_id)?;
    Ok(Json(state.races.get_results(race_id)?))
}

async fn start_race_handler(
    State(state): State<AppState>,
    Path(race_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let race_id = parse_race_id(&race_id)?;
    state.races.start_race(race_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn accelerate_handler(
    State(state): State<AppState>,
    Path(race_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let race_id = parse_race_id(&race_id)?;
    state.races.accelerate(race_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn not_found_handler() -> AppError {
    AppError::NotFound("no such route".to_string())
}

/// Race ids in paths are positive integers; anything else names no race
fn parse_race_id(raw: &str) -> Result<RaceId, AppError> {
    raw.parse::<RaceId>()
        .map_err(|_| AppError::NotFound(format!("race {} not found", raw)))
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

impl From<RaceError> for AppError {
    fn from(err: RaceError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => AppError::NotFound(err.to_string()),
            ErrorKind::InvalidState | ErrorKind::Validation => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
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
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::catalog::Catalog;
    use crate::config::Config;

    const CATALOG: &str = r#"{
        "cars": [
            {"id": 1, "driver_name": "Ayrton", "top_speed": 180, "acceleration": 10, "handling": 0.9},
            {"id": 2, "driver_name": "Alain", "top_speed": 170, "acceleration": 9, "handling": 0.8}
        ],
        "tracks": [
            {"id": 1, "name": "Monza", "segments": [0, 10, 20, 30]}
        ]
    }"#;

    fn app() -> Router {
        let config = Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "debug".to_string(),
            log_json: false,
            data_file: "data.json".into(),
            tick_period: Duration::from_millis(20),
            client_origin: "http://localhost:3000".to_string(),
        };
        let catalog = Catalog::from_reader(CATALOG.as_bytes()).unwrap();
        build_router(AppState::new(config, catalog).unwrap())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn lists_catalog() {
        let app = app();

        let (status, cars) = send(&app, "GET", "/api/cars", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cars.as_array().unwrap().len(), 2);
        assert_eq!(cars[0]["driver_name"], "Ayrton");

        let (status, tracks) = send(&app, "GET", "/api/tracks", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tracks[0]["segments"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn create_and_read_race() {
        let app = app();

        let (status, race) = send(
            &app,
            "POST",
            "/api/races",
            Some(serde_json::json!({"player_id": 2, "track_id": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(race["id"], 1);
        assert_eq!(race["player_id"], 2);
        assert_eq!(race["track"]["name"], "Monza");
        assert_eq!(race["track"]["segments"], serde_json::json!([0, 10, 20, 30]));
        assert_eq!(race["cars"].as_array().unwrap().len(), 2);
        assert_eq!(race["cars"][1]["driver_name"], "Alain");
        assert_eq!(race["results"]["status"], "unstarted");
        assert_eq!(race["results"]["positions"].as_array().unwrap().len(), 2);

        let (status, results) = send(&app, "GET", "/api/races/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(results["status"], "unstarted");
        assert_eq!(results["positions"][1]["driver_name"], "Alain");
        assert_eq!(results["positions"][1]["speed"], 0);

        let (_, listed) = send(&app, "GET", "/api/races", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["track_name"], "Monza");
        assert_eq!(listed[0]["car_count"], 2);
    }

    #[tokio::test]
    async fn start_then_start_again_is_bad_request() {
        let app = app();
        send(
            &app,
            "POST",
            "/api/races",
            Some(serde_json::json!({"player_id": 1, "track_id": 1})),
        )
        .await;

        let (status, _) = send(&app, "POST", "/api/races/1/start", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "POST", "/api/races/1/accelerate", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "POST", "/api/races/1/start", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("already started"));

        let (_, results) = send(&app, "GET", "/api/races/1/results", None).await;
        assert_ne!(results["status"], "unstarted");
    }

    #[tokio::test]
    async fn error_mapping() {
        let app = app();

        let (status, _) = send(
            &app,
            "POST",
            "/api/races",
            Some(serde_json::json!({"player_id": 1, "track_id": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/api/races",
            Some(serde_json::json!({"player_id": 9, "track_id": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for uri in ["/api/races/0", "/api/races/3", "/api/races/-1", "/api/races/abc"] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert!(body["error"].is_string());
        }

        let (status, _) = send(&app, "POST", "/api/races/4/accelerate", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_counts_races() {
        let app = app();
        send(
            &app,
            "POST",
            "/api/races",
            Some(serde_json::json!({"player_id": 1, "track_id": 1})),
        )
        .await;

        let (status, health) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["races"], 1);
        assert_eq!(health["active_races"], 0);
    }
}
