//! Local HTTP remote: read the player state and drive play/pause/select
//! from scripts or desktop media keys.

use std::sync::{Arc, RwLock};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::action::Action;
use crate::controller::{PlaybackPhase, SessionState};
use crate::media_session::{MediaAction, MediaSessionSnapshot, SharedMediaSession};

#[derive(Debug, Clone, Serialize)]
pub struct StationInfo {
    pub idx: usize,
    pub name: String,
    pub shortcode: String,
    pub stream_url: String,
}

/// What the remote can see of the session; republished by the app loop.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    pub stations: Vec<StationInfo>,
    pub selected: Option<usize>,
    pub phase: PlaybackPhase,
    pub playing: bool,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            stations: Vec::new(),
            selected: None,
            phase: PlaybackPhase::Idle,
            playing: false,
        }
    }
}

impl PlayerStatus {
    pub fn from_session(session: &SessionState) -> Self {
        Self {
            stations: session
                .stations
                .iter()
                .enumerate()
                .map(|(idx, s)| StationInfo {
                    idx,
                    name: s.display_name.clone(),
                    shortcode: s.shortcode.clone(),
                    stream_url: s.stream_url.clone(),
                })
                .collect(),
            selected: session.selected,
            phase: session.phase,
            playing: session.is_playing(),
        }
    }
}

pub type SharedStatus = Arc<RwLock<PlayerStatus>>;

#[derive(Clone)]
pub struct HttpState {
    pub status: SharedStatus,
    pub media: SharedMediaSession,
    pub action_tx: mpsc::Sender<Action>,
}

#[derive(Serialize)]
struct ApiState {
    #[serde(flatten)]
    status: PlayerStatus,
    media: MediaSessionSnapshot,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/media/:action", get(media_action).post(media_action))
        .route("/api/station/:idx", get(select_station).post(select_station))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn start_server(bind_address: String, port: u16, state: HttpState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("[http] failed to bind {}: {}", addr, e);
                return;
            }
        };
        info!("[http] remote listening on http://{}", addr);
        if let Err(e) = axum::serve(listener, router(state)).await {
            error!("[http] server error: {}", e);
        }
    })
}

fn read_status(state: &HttpState) -> PlayerStatus {
    state
        .status
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

async fn get_state(State(state): State<HttpState>) -> Json<ApiState> {
    Json(ApiState {
        status: read_status(&state),
        media: state.media.snapshot(),
    })
}

async fn dispatch(state: &HttpState, action: Action) -> StatusCode {
    if state.action_tx.send(action).await.is_err() {
        error!("[http] app loop gone");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::ACCEPTED
}

async fn media_action(State(state): State<HttpState>, Path(name): Path<String>) -> StatusCode {
    let action = if name.eq_ignore_ascii_case("toggle") {
        Action::TogglePlay
    } else {
        match MediaAction::parse(&name) {
            Some(MediaAction::Play) => Action::Play,
            Some(MediaAction::Pause) => Action::Pause,
            Some(other) => {
                info!("[http] media action {:?} is not available for live radio", other);
                return StatusCode::NOT_IMPLEMENTED;
            }
            None => return StatusCode::NOT_FOUND,
        }
    };
    info!("[http] media action {}", name);
    dispatch(&state, action).await
}

async fn select_station(State(state): State<HttpState>, Path(idx): Path<usize>) -> StatusCode {
    if idx >= read_status(&state).stations.len() {
        return StatusCode::NOT_FOUND;
    }
    info!("[http] select station {}", idx);
    dispatch(&state, Action::Select(idx)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state_with_stations(n: usize) -> (HttpState, mpsc::Receiver<Action>) {
        let (action_tx, rx) = mpsc::channel(8);
        let status = PlayerStatus {
            stations: (0..n)
                .map(|idx| StationInfo {
                    idx,
                    name: format!("Station {}", idx),
                    shortcode: format!("s{}", idx),
                    stream_url: format!("https://radio.example/s{}.mp3", idx),
                })
                .collect(),
            selected: Some(0),
            phase: PlaybackPhase::Selected,
            playing: false,
        };
        let state = HttpState {
            status: Arc::new(RwLock::new(status)),
            media: SharedMediaSession::new(),
            action_tx,
        };
        (state, rx)
    }

    async fn call(state: HttpState, method: &str, uri: &str) -> axum::response::Response {
        router(state)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    #[tokio::test]
    async fn test_state_includes_stations_and_media() {
        let (state, _rx) = state_with_stations(2);
        let resp = call(state, "GET", "/api/state").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["stations"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(json["phase"], "selected");
        assert_eq!(json["media"]["playback_state"], "none");
        assert_eq!(
            json["media"]["supported_actions"],
            serde_json::json!(["play", "pause"])
        );
    }

    #[tokio::test]
    async fn test_play_pause_toggle_are_forwarded() {
        let (state, mut rx) = state_with_stations(1);
        for (uri, expected) in [
            ("/api/media/play", Action::Play),
            ("/api/media/pause", Action::Pause),
            ("/api/media/toggle", Action::TogglePlay),
        ] {
            let resp = call(state.clone(), "POST", uri).await;
            assert_eq!(resp.status(), StatusCode::ACCEPTED);
            assert_eq!(rx.recv().await, Some(expected));
        }
    }

    #[tokio::test]
    async fn test_seek_and_skip_are_not_implemented() {
        let (state, mut rx) = state_with_stations(1);
        for action in ["seekto", "seekforward", "seekbackward", "nexttrack", "previoustrack"] {
            let resp = call(state.clone(), "POST", &format!("/api/media/{}", action)).await;
            assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED, "{}", action);
        }
        let resp = call(state.clone(), "GET", "/api/media/rewind").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_select_station_bounds() {
        let (state, mut rx) = state_with_stations(2);
        let resp = call(state.clone(), "POST", "/api/station/1").await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(rx.recv().await, Some(Action::Select(1)));

        let resp = call(state, "POST", "/api/station/7").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
