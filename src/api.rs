use crate::auth::CurrentUser;
use crate::draft::{Draft, DraftAction};
use crate::errors::AppError;
use crate::handlers::{advance_program, save_draft, set_workout_completed};
use crate::models::{CreatedResponse, Program, ProgramStatus, Workout};
use crate::state::AppState;
use crate::store::Record;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct NewProgramDraftRequest {
    pub duration: Option<u32>,
    /// Id of an existing program to edit.
    pub from: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewWorkoutDraftRequest {
    pub from: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DraftResponse {
    pub id: Uuid,
    pub draft: Draft,
}

pub async fn list_programs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<Vec<Program>> {
    Json(state.gateway.list::<Program>(&user).await)
}

pub async fn get_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Program>, AppError> {
    Ok(Json(state.gateway.get::<Program>(&user, &id).await?))
}

pub async fn delete_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.gateway.delete::<Program>(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Program>, AppError> {
    advance_program(&state, &user, &id, ProgramStatus::InProgress).await?;
    Ok(Json(state.gateway.get::<Program>(&user, &id).await?))
}

pub async fn complete_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Program>, AppError> {
    advance_program(&state, &user, &id, ProgramStatus::Completed).await?;
    Ok(Json(state.gateway.get::<Program>(&user, &id).await?))
}

pub async fn list_workouts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<Vec<Workout>> {
    Json(state.gateway.list::<Workout>(&user).await)
}

pub async fn get_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Workout>, AppError> {
    Ok(Json(state.gateway.get::<Workout>(&user, &id).await?))
}

pub async fn delete_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.gateway.delete::<Workout>(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Workout>, AppError> {
    set_workout_completed(&state, &user, &id, true).await?;
    Ok(Json(state.gateway.get::<Workout>(&user, &id).await?))
}

pub async fn incomplete_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Workout>, AppError> {
    set_workout_completed(&state, &user, &id, false).await?;
    Ok(Json(state.gateway.get::<Workout>(&user, &id).await?))
}

/// Long poll: resolves with the fresh list once the user's collection
/// changes.
pub async fn watch<R>(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Json<Vec<R>>
where
    R: Record + Serialize,
{
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let subscription = state.gateway.subscribe::<R, _>(&user, move |records| {
        let _ = sender.send(records);
    });
    let _current = receiver.recv().await;
    let next = receiver.recv().await.unwrap_or_default();
    subscription.unsubscribe();
    debug!(%user, records = next.len(), "watch resolved");
    Json(next)
}

pub async fn new_program_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<NewProgramDraftRequest>,
) -> Result<(StatusCode, Json<DraftResponse>), AppError> {
    let draft = match request.from {
        Some(from) => Draft::from_program(&state.gateway.get::<Program>(&user, &from).await?),
        None => Draft::program(request.duration.unwrap_or(4))?,
    };
    let id = state.open_draft(&user, draft.clone()).await;
    Ok((StatusCode::CREATED, Json(DraftResponse { id, draft })))
}

pub async fn new_workout_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<NewWorkoutDraftRequest>,
) -> Result<(StatusCode, Json<DraftResponse>), AppError> {
    let draft = match request.from {
        Some(from) => Draft::from_workout(&state.gateway.get::<Workout>(&user, &from).await?),
        None => Draft::workout(),
    };
    let id = state.open_draft(&user, draft.clone()).await;
    Ok((StatusCode::CREATED, Json(DraftResponse { id, draft })))
}

pub async fn get_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftResponse>, AppError> {
    let draft = state
        .draft(&user, id)
        .await
        .ok_or_else(|| AppError::not_found(format!("draft {id} not found")))?;
    Ok(Json(DraftResponse { id, draft }))
}

pub async fn apply_draft_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(action): Json<DraftAction>,
) -> Result<Json<DraftResponse>, AppError> {
    let mut draft = state
        .draft(&user, id)
        .await
        .ok_or_else(|| AppError::not_found(format!("draft {id} not found")))?;
    draft.apply(action)?;
    state.store_draft(&user, id, draft.clone()).await;
    Ok(Json(DraftResponse { id, draft }))
}

pub async fn submit_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CreatedResponse>, AppError> {
    let draft = state
        .draft(&user, id)
        .await
        .ok_or_else(|| AppError::not_found(format!("draft {id} not found")))?;
    let saved = save_draft(&state, &user, &draft).await?;
    state.close_draft(&user, id).await;
    Ok(Json(CreatedResponse { id: saved.id }))
}
