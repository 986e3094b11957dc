// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP control surface for a UI collaborator.
//!
//! | Method | Path | Effect |
//! |--------|------|--------|
//! | GET | `/health` | liveness |
//! | GET | `/v1/mission` | [`MissionStatus`] |
//! | POST | `/v1/mission/start` | Idle → Running (cycle 1 runs in the background) |
//! | POST | `/v1/mission/stop` | Running → Idle |
//! | POST | `/v1/mission/reset` | body `{"confirm": true}` |
//! | POST | `/v1/mission/resume` | restore snapshot, then start |
//! | GET | `/v1/graph` | every node with its invalidation flag |
//! | GET | `/v1/agents` | active agents and their metrics |
//! | GET | `/v1/events` | Server-Sent Events of [`MissionEvent`]s |
//! | GET | `/v1/agents/{id}/events` | the same stream filtered to one agent |

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::application::scheduler::{
    AgentStatus, CycleScheduler, GraphView, MissionStatus, SchedulerError, StartTicket,
};
use crate::domain::agent::AgentId;
use crate::domain::events::MissionEvent;
use crate::infrastructure::event_bus::EventBusError;

pub struct AppState {
    pub scheduler: CycleScheduler,
    pub started_at: Instant,
}

pub fn app(scheduler: CycleScheduler) -> Router {
    let state = Arc::new(AppState {
        scheduler,
        started_at: Instant::now(),
    });

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/mission", get(status_handler))
        .route("/v1/mission/start", post(start_handler))
        .route("/v1/mission/stop", post(stop_handler))
        .route("/v1/mission/reset", post(reset_handler))
        .route("/v1/mission/resume", post(resume_handler))
        .route("/v1/graph", get(graph_handler))
        .route("/v1/agents", get(agents_handler))
        .route("/v1/agents/{id}/events", get(agent_events_handler))
        .route("/v1/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiError(SchedulerError);

impl From<SchedulerError> for ApiError {
    fn from(value: SchedulerError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SchedulerError::AlreadyRunning | SchedulerError::MissionCompleted => StatusCode::CONFLICT,
            SchedulerError::ConfirmationRequired => StatusCode::BAD_REQUEST,
            SchedulerError::NoSnapshot => StatusCode::NOT_FOUND,
            SchedulerError::Persistence(_) | SchedulerError::Restore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<MissionStatus> {
    Json(state.scheduler.status().await)
}

/// Cycle 1 can take minutes, so it runs detached and the caller polls status
fn spawn_first_cycle(scheduler: CycleScheduler, ticket: StartTicket) {
    tokio::spawn(async move { scheduler.run_first_cycle(ticket).await });
}

async fn start_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let ticket = state.scheduler.begin().await?;
    spawn_first_cycle(state.scheduler.clone(), ticket);
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}

async fn stop_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stopped = state.scheduler.stop().await;
    Json(json!({ "stopped": stopped }))
}

async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<MissionStatus>, ApiError> {
    state.scheduler.reset(request.confirm).await?;
    Ok(Json(state.scheduler.status().await))
}

async fn resume_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let indexed = state.scheduler.restore().await?;
    let ticket = state.scheduler.begin().await?;
    spawn_first_cycle(state.scheduler.clone(), ticket);
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "accepted": true, "indexed_nodes": indexed })),
    ))
}

async fn graph_handler(State(state): State<Arc<AppState>>) -> Json<GraphView> {
    Json(state.scheduler.graph_view().await)
}

async fn agents_handler(State(state): State<Arc<AppState>>) -> Json<Vec<AgentStatus>> {
    Json(state.scheduler.agents_view().await)
}

async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.scheduler.events().raw_receiver();
    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(event) => to_sse_event(&event),
        Err(e) => {
            debug!("SSE subscriber skipped events: {}", e);
            None
        }
    });
    Sse::new(stream.map(Ok::<Event, Infallible>)).keep_alive(KeepAlive::default())
}

async fn agent_events_handler(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.scheduler.events().subscribe_agent(AgentId::new(agent_id));
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(sse) = to_sse_event(&event) {
                        return Some((sse, receiver));
                    }
                }
                Err(EventBusError::Lagged(n)) => debug!("Agent SSE subscriber skipped {} events", n),
                Err(_) => return None,
            }
        }
    });
    Sse::new(stream.map(Ok::<Event, Infallible>)).keep_alive(KeepAlive::default())
}

fn to_sse_event(event: &MissionEvent) -> Option<Event> {
    let kind = serde_json::to_value(event)
        .ok()?
        .get("type")
        .and_then(|t| t.as_str())
        .map(str::to_string)?;
    Event::default().event(kind).json_data(event).ok()
}
