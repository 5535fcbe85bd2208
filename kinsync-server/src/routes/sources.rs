//! Calendar source and sync endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use kinsync_core::{
    CalendarSource, Event, KinsyncError, NewSource, SourceId, SyncError, SyncMode, SyncReport,
};
use serde::{Deserialize, Serialize};

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sources", get(list_sources).post(create_source))
        .route("/sources/{id}", patch(update_source).delete(delete_source))
        .route("/sources/{id}/sync", post(sync_source))
        .route("/sources/{id}/events", get(list_events))
        .route("/sync", post(sync_all))
}

/// GET /sources
async fn list_sources(
    State(state): State<AppState>,
) -> Result<Json<Vec<CalendarSource>>, AppError> {
    Ok(Json(state.scheduler.sources()?))
}

/// POST /sources - Subscribe to a feed. Nothing is fetched yet.
async fn create_source(
    State(state): State<AppState>,
    Json(req): Json<NewSource>,
) -> Result<(StatusCode, Json<CalendarSource>), AppError> {
    let source = state.scheduler.add_source(req)?;
    Ok((StatusCode::CREATED, Json(source)))
}

#[derive(Deserialize)]
pub struct UpdateSourceRequest {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub auto_sync: Option<bool>,
}

/// PATCH /sources/:id
async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSourceRequest>,
) -> Result<Json<CalendarSource>, AppError> {
    let scheduler = &state.scheduler;
    let id = SourceId::from(id);

    let mut source = scheduler
        .registry()
        .get(&id)?
        .ok_or_else(|| KinsyncError::SourceNotFound(id.clone()))?;

    if let Some(name) = req.name {
        source = scheduler.rename(&id, &name)?;
    }
    if let Some(enabled) = req.enabled {
        source = scheduler.set_enabled(&id, enabled)?;
    }
    if let Some(auto_sync) = req.auto_sync {
        source = scheduler.set_auto_sync(&id, auto_sync)?;
    }

    Ok(Json(source))
}

#[derive(Serialize)]
pub struct DeleteSourceResponse {
    pub removed_events: usize,
}

/// DELETE /sources/:id - Unsubscribe and delete the source's imported events
async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSourceResponse>, AppError> {
    let removed_events = state.scheduler.remove_source(&SourceId::from(id))?;
    Ok(Json(DeleteSourceResponse { removed_events }))
}

/// POST /sources/:id/sync - Sync one source now
async fn sync_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SyncReport>, AppError> {
    let report = state
        .scheduler
        .sync_one(&SourceId::from(id), SyncMode::Interactive)
        .await?;
    Ok(Json(report))
}

/// Result for one source of a `POST /sync` sweep
#[derive(Serialize)]
pub struct SyncOutcome {
    pub source_id: SourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<(SourceId, Result<SyncReport, SyncError>)> for SyncOutcome {
    fn from((source_id, result): (SourceId, Result<SyncReport, SyncError>)) -> Self {
        match result {
            Ok(report) => SyncOutcome {
                source_id,
                report: Some(report),
                error: None,
            },
            Err(e) => SyncOutcome {
                source_id,
                report: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// POST /sync - Run an auto-sync sweep now
async fn sync_all(State(state): State<AppState>) -> Json<Vec<SyncOutcome>> {
    let outcomes = state.scheduler.sweep().await;
    Json(outcomes.into_iter().map(SyncOutcome::from).collect())
}

/// GET /sources/:id/events - Events imported from a source, by start time
async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Event>>, AppError> {
    let id = SourceId::from(id);

    if state.scheduler.registry().get(&id)?.is_none() {
        return Err(KinsyncError::SourceNotFound(id).into());
    }

    let mut events = state.scheduler.store().list_by_source(&id)?;
    events.sort_by_key(|e| e.start);

    Ok(Json(events))
}
