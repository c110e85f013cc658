use std::convert::Infallible;

use async_stream::stream as async_stream;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event as SseEvent, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::application::EngineError;
use crate::domain::{LiveEvent, RuleId, TriggerRule};
use crate::infrastructure::engine::EngineHandle;
use crate::infrastructure::round_source::SharedRoundSource;

#[derive(Clone)]
pub struct ApiState {
    pub engine: EngineHandle,
    pub rounds: SharedRoundSource,
    pub api_token: Option<String>,
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rules", get(list_rules).post(upsert_rule))
        .route("/rules/:id", get(get_rule).delete(delete_rule))
        .route("/logs", get(recent_logs))
        .route("/logs/stream", get(stream_logs))
        .route("/preview", post(preview))
        .route("/events", post(submit_event))
        .route("/context/round-ended", post(round_ended))
        .route("/context/match-ended", post(match_ended))
        .route("/context/round", get(current_round).put(set_round))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn list_rules(State(state): State<ApiState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    Json(state.engine.list_rules()).into_response()
}

async fn upsert_rule(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(rule): Json<TriggerRule>,
) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    match state.engine.upsert_rule(rule).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_rule(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    match state.engine.get_rule(&RuleId::new(id)) {
        Ok(rule) => Json(rule).into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_rule(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    match state.engine.delete_rule(RuleId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn recent_logs(
    State(state): State<ApiState>,
    Query(q): Query<LogsQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    let limit = q.limit.unwrap_or(50).min(500);
    Json(state.engine.recent_logs(limit)).into_response()
}

#[derive(Deserialize)]
struct StreamQuery {
    replay: Option<usize>,
}

async fn stream_logs(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(q): Query<StreamQuery>,
) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }

    let replay = q.replay.unwrap_or(20).min(200);
    // recent() is newest first; replay oldest to newest
    let mut history = state.engine.recent_logs(replay);
    history.reverse();

    let rx = state.engine.subscribe_outcomes();
    let live = BroadcastStream::new(rx).filter_map(|msg| {
        let entry = msg.ok()?; // lagged/closed
        let data = serde_json::to_string(&entry).ok()?;
        Some(Ok::<SseEvent, Infallible>(
            SseEvent::default().event("outcome").data(data),
        ))
    });

    let out_stream = async_stream! {
        for entry in history {
            let data = serde_json::to_string(&entry).unwrap_or_else(|_| "{}".to_string());
            yield Ok::<SseEvent, Infallible>(SseEvent::default().event("replay").data(data));
        }

        tokio::pin!(live);
        while let Some(item) = live.next().await {
            yield item;
        }
    };

    Sse::new(out_stream).into_response()
}

#[derive(Deserialize)]
struct PreviewRequest {
    rule: TriggerRule,
    event: LiveEvent,
}

async fn preview(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<PreviewRequest>,
) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    if let Err(e) = req.rule.validate() {
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }
    Json(state.engine.preview(&req.rule, &req.event)).into_response()
}

async fn submit_event(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(event): Json<LiveEvent>,
) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    match state.engine.submit_event(event).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(e),
    }
}

async fn round_ended(State(state): State<ApiState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    match state.engine.round_ended().await {
        Ok(()) => {
            state.rounds.advance();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn match_ended(State(state): State<ApiState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    match state.engine.match_ended().await {
        Ok(()) => {
            state.rounds.reset();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn current_round(State(state): State<ApiState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    Json(serde_json::json!({ "round": state.engine.current_round() })).into_response()
}

#[derive(Deserialize)]
struct SetRoundRequest {
    round: u32,
}

async fn set_round(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<SetRoundRequest>,
) -> impl IntoResponse {
    if let Err((code, msg)) = check_auth(&headers, &state.api_token) {
        return (code, msg).into_response();
    }
    state.rounds.set(req.round);
    StatusCode::NO_CONTENT.into_response()
}

fn error_response(e: EngineError) -> axum::response::Response {
    let code = match &e {
        EngineError::Config(_) => StatusCode::BAD_REQUEST,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Executor(_) => StatusCode::BAD_GATEWAY,
        EngineError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, e.to_string()).into_response()
}

fn check_auth(headers: &HeaderMap, token: &Option<String>) -> Result<(), (StatusCode, String)> {
    let Some(expected) = token else {
        return Ok(());
    }; // no token configured, auth disabled
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if auth == format!("Bearer {}", expected) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "unauthorized".to_string()))
    }
}
