//! HTTP surface: static pages, per-game MJPEG streams, queries and commands.
//!
//! - `GET /`, `/air`, `/face`, `/rps`: pages
//! - `GET /air/video`, `/face/video`, `/rps/video_feed`: `multipart/x-mixed-replace` streams
//! - `GET /air/result`, `/face/find`, `/rps/status`: polled state
//! - `POST /rps/start`, `/rps/reset`: round commands

use std::{net::SocketAddr, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    games::{Arcade, GameSession, StreamChunk, spawn_stream},
    pipeline::{CaptureStatus, LatestFrameChannel},
    robot::Mood,
};

pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";
/// Encoded parts buffered per viewer before the game loop blocks.
const STREAM_BUFFER: usize = 2;

type AppState = Arc<Arcade>;

pub fn router(arcade: Arc<Arcade>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/air", get(air_page))
        .route("/face", get(face_page))
        .route("/rps", get(rps_page))
        .route("/air/video", get(air_video))
        .route("/face/video", get(face_video))
        .route("/rps/video_feed", get(rps_video))
        .route("/air/result", get(air_result))
        .route("/face/find", get(face_find))
        .route("/rps/status", get(rps_status))
        .route("/rps/start", post(rps_start))
        .route("/rps/reset", post(rps_reset))
        .with_state(arcade)
}

pub async fn serve(arcade: Arc<Arcade>, bind: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind to {bind}"))?;
    log::info!("gesture arcade listening on http://{bind}");

    axum::serve(listener, router(arcade))
        .await
        .context("web server error")
}

async fn index(State(state): State<AppState>) -> Html<&'static str> {
    state.robot.notify(Mood::Neutral);
    Html(include_str!("../assets/index.html"))
}

async fn air_page() -> Html<&'static str> {
    Html(include_str!("../assets/air.html"))
}

async fn face_page() -> Html<&'static str> {
    Html(include_str!("../assets/face.html"))
}

async fn rps_page() -> Html<&'static str> {
    Html(include_str!("../assets/rps.html"))
}

async fn air_video(State(state): State<AppState>) -> Response {
    let channel = state.air.channel().clone();
    stream_response("air", state.air.session(), channel, state.status.clone())
}

async fn face_video(State(state): State<AppState>) -> Response {
    let channel = state.face.channel().clone();
    stream_response("face", state.face.session(), channel, state.status.clone())
}

async fn rps_video(State(state): State<AppState>) -> Response {
    let channel = state.rps.channel().clone();
    stream_response("rps", state.rps.session(), channel, state.status.clone())
}

fn stream_response<S>(
    name: &'static str,
    session: S,
    channel: Arc<LatestFrameChannel>,
    status: CaptureStatus,
) -> Response
where
    S: GameSession + 'static,
{
    let (tx, rx) = mpsc::channel::<StreamChunk>(STREAM_BUFFER);
    if let Err(err) = spawn_stream(name, session, channel, status, tx) {
        log::error!("{err:?}");
        return (StatusCode::SERVICE_UNAVAILABLE, "stream unavailable").into_response();
    }

    (
        [
            (header::CONTENT_TYPE, MULTIPART_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

async fn air_result(State(state): State<AppState>) -> Json<Value> {
    let body = state
        .air
        .result()
        .and_then(|result| serde_json::to_value(result).ok())
        .unwrap_or_else(|| json!({}));
    Json(body)
}

async fn face_find(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.face.find())
}

async fn rps_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.rps.status())
}

async fn rps_start(State(state): State<AppState>) -> Json<Value> {
    let changed = state.rps.start(Instant::now());
    Json(json!({ "success": true, "changed": changed }))
}

async fn rps_reset(State(state): State<AppState>) -> Json<Value> {
    let changed = state.rps.reset();
    Json(json!({ "success": true, "changed": changed }))
}
