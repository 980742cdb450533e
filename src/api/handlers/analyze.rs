use crate::{
    AppState,
    analysis::{ChannelSink, NullSink, ProgressEvent},
    types::{AnalyzeRequest, AnalyzeResponse, AppError, Result, StoredAnalysis},
};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;

/// Health check
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run a full analysis and return the merged result synchronously
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Merged analysis", body = AnalyzeResponse),
        (status = 400, description = "Missing or empty topic"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 502, description = "All AI providers failed"),
        (status = 503, description = "Analysis disabled")
    ),
    tag = "analysis"
)]
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    let topic = precheck(&state, &headers, &payload)?;

    // The synchronous endpoint has no progress consumer and no way to learn
    // about a disconnect mid-run, so the token is never cancelled.
    let cancel = CancellationToken::new();
    let record = state
        .scheduler
        .run(&topic, &NullSink, &cancel)
        .await?
        .ok_or_else(|| AppError::Internal("analysis cancelled unexpectedly".to_string()))?;

    Ok(Json(AnalyzeResponse {
        id: record.id,
        result: record.result,
    }))
}

/// Run a full analysis, streaming lifecycle events as they happen
#[utoipa::path(
    post,
    path = "/api/analyze/stream",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "SSE event sequence terminated by complete or error"),
        (status = 400, description = "Missing or empty topic"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 503, description = "Analysis disabled")
    ),
    tag = "analysis"
)]
pub async fn analyze_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let topic = precheck(&state, &headers, &payload)?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let cancel = CancellationToken::new();

    let scheduler = state.scheduler.clone();
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        let sink = ChannelSink::new(tx);
        match scheduler.run(&topic, &sink, &task_cancel).await {
            Ok(Some(record)) => {
                tracing::info!(id = %record.id, topic = %record.topic, "analysis complete")
            }
            Ok(None) => tracing::info!(topic = %topic, "analysis cancelled by caller"),
            // Terminal failures were already emitted as error events.
            Err(e) => tracing::warn!(topic = %topic, error = %e, "analysis failed"),
        }
    });

    // Dropping the stream (caller disconnected) cancels the scheduler token,
    // which the run observes at its checkpoints.
    let guard = cancel.drop_guard();
    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            let done = matches!(
                event,
                ProgressEvent::Complete { .. } | ProgressEvent::Error { .. }
            );
            match Event::default().json_data(&event) {
                Ok(sse_event) => yield Ok(sse_event),
                Err(e) => tracing::warn!(error = %e, "failed to encode progress event"),
            }
            if done {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Fetch a persisted analysis by id
#[utoipa::path(
    get,
    path = "/api/analysis/{id}",
    responses(
        (status = 200, description = "Persisted analysis", body = StoredAnalysis),
        (status = 404, description = "Unknown id")
    ),
    tag = "analysis"
)]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredAnalysis>> {
    match state.store.fetch(&id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(AppError::NotFound("Analysis not found".to_string())),
    }
}

/// Shared request gate: kill switch, rate limit, topic validation, provider
/// availability. Returns the trimmed topic.
fn precheck(state: &AppState, headers: &HeaderMap, payload: &AnalyzeRequest) -> Result<String> {
    if !state.config.analysis.enabled {
        return Err(AppError::Disabled);
    }

    let ip = client_ip(headers);
    let decision = state.rate_limiter.check_and_record(&ip);
    if !decision.allowed {
        let minutes = decision
            .retry_after
            .map(|d| d.as_secs().div_ceil(60).max(1))
            .unwrap_or(1);
        let unit = if minutes == 1 { "minute" } else { "minutes" };
        return Err(AppError::RateLimited(format!(
            "You've reached the analysis limit. Try again in {minutes} {unit}."
        )));
    }

    let topic = payload.topic.trim();
    if topic.is_empty() {
        return Err(AppError::InvalidInput(
            "Please provide a topic to analyze".to_string(),
        ));
    }

    if state.scheduler.provider_ids().is_empty() {
        return Err(AppError::NoProviders);
    }

    Ok(topic.to_string())
}

/// Client IP: first hop of `x-forwarded-for`, then `x-real-ip`, then
/// "unknown".
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string()
}
