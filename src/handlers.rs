use crate::auth::{self, CurrentUser};
use crate::collect::{self, Collected};
use crate::config::ListMode;
use crate::draft::{Draft, DraftError};
use crate::errors::AppError;
use crate::form::{FormOp, FormSubmission};
use crate::models::{Program, ProgramPatch, ProgramStatus, Workout, WorkoutPatch};
use crate::state::AppState;
use crate::store::Collection;
use crate::ui::{self, Flash};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Record id handed from one page to the next.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewProgramQuery {
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    pub collection: Collection,
    pub id: String,
}

pub async fn index() -> Redirect {
    Redirect::to("/programs")
}

pub async fn sign_in_page(headers: HeaderMap) -> Response {
    if auth::user_from_headers(&headers).is_some() {
        return Redirect::to("/programs").into_response();
    }
    Html(ui::render_sign_in(None)).into_response()
}

pub async fn sign_in(Form(form): Form<SignInForm>) -> Response {
    let user = form.user.trim();
    if !auth::is_valid_user_id(user) {
        let flash = Flash::error("User names may only contain letters, digits and - _ . @");
        return (StatusCode::BAD_REQUEST, Html(ui::render_sign_in(Some(&flash)))).into_response();
    }
    info!(%user, "signed in");
    (
        AppendHeaders([(header::SET_COOKIE, auth::sign_in_cookie(user))]),
        Redirect::to("/programs"),
    )
        .into_response()
}

pub async fn sign_out() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, auth::sign_out_cookie())]),
        Redirect::to(auth::SIGN_IN_PATH),
    )
}

// Programs

pub async fn programs_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Html<String> {
    let flash = notice_flash(query.notice.as_deref());
    programs_with_flash(&state, &user, flash.as_ref()).await
}

async fn programs_with_flash(state: &AppState, user: &str, flash: Option<&Flash>) -> Html<String> {
    let programs = state.gateway.list::<Program>(user).await;
    Html(ui::render_programs(
        user,
        &programs,
        state.list_mode == ListMode::Live,
        flash,
    ))
}

pub async fn new_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NewProgramQuery>,
) -> Response {
    let raw = query.duration.unwrap_or_else(|| "4".to_string());
    let draft = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Duration must be a whole number of weeks, got '{raw}'"))
        .and_then(|duration| Draft::program(duration).map_err(|err| err.to_string()));
    match draft {
        Ok(draft) => {
            let id = state.open_draft(&user, draft).await;
            Redirect::to(&format!("/drafts/{id}")).into_response()
        }
        Err(message) => {
            let flash = Flash::error(message);
            (
                StatusCode::BAD_REQUEST,
                programs_with_flash(&state, &user, Some(&flash)).await,
            )
                .into_response()
        }
    }
}

pub async fn view_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    match load_program(&state, &user, query.id.as_deref()).await {
        Some(program) => Html(ui::render_program_detail(&user, &program, None)).into_response(),
        None => Redirect::to("/programs").into_response(),
    }
}

pub async fn edit_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Redirect {
    match load_program(&state, &user, query.id.as_deref()).await {
        Some(program) => {
            let id = state.open_draft(&user, Draft::from_program(&program)).await;
            Redirect::to(&format!("/drafts/{id}"))
        }
        None => Redirect::to("/programs"),
    }
}

pub async fn start_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    move_program_page(&state, &user, query.id.as_deref(), ProgramStatus::InProgress).await
}

pub async fn complete_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    move_program_page(&state, &user, query.id.as_deref(), ProgramStatus::Completed).await
}

async fn move_program_page(
    state: &AppState,
    user: &str,
    id: Option<&str>,
    to: ProgramStatus,
) -> Response {
    let Some(program) = load_program(state, user, id).await else {
        return Redirect::to("/programs").into_response();
    };
    match advance_program(state, user, &program.id, to).await {
        Ok(()) => Redirect::to(&format!("/programs/view?id={}", program.id)).into_response(),
        Err(err) => {
            let flash = Flash::error(err.message);
            (err.status, Html(ui::render_program_detail(user, &program, Some(&flash)))).into_response()
        }
    }
}

pub async fn confirm_delete_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    match load_program(&state, &user, query.id.as_deref()).await {
        Some(program) => Html(ui::render_confirm_delete(
            &user,
            "program",
            &program.name,
            &format!("/programs/delete?id={}", program.id),
            "/programs",
        ))
        .into_response(),
        None => Redirect::to("/programs").into_response(),
    }
}

pub async fn delete_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    let Some(id) = query.id else {
        return Redirect::to("/programs").into_response();
    };
    match state.gateway.delete::<Program>(&user, &id).await {
        Ok(()) => Redirect::to("/programs?notice=deleted").into_response(),
        Err(err) => {
            let err = AppError::from(err);
            let flash = Flash::error(format!("Error deleting program: {}", err.message));
            (err.status, programs_with_flash(&state, &user, Some(&flash)).await).into_response()
        }
    }
}

async fn load_program(state: &AppState, user: &str, id: Option<&str>) -> Option<Program> {
    let id = id?;
    match state.gateway.get::<Program>(user, id).await {
        Ok(program) => Some(program),
        Err(err) => {
            debug!("program lookup failed: {err}");
            None
        }
    }
}

pub(crate) async fn advance_program(
    state: &AppState,
    user: &str,
    id: &str,
    to: ProgramStatus,
) -> Result<(), AppError> {
    state
        .gateway
        .modify::<Program, _>(user, id, |program| {
            if !program.status.can_move_to(to) {
                return Err(format!(
                    "Program is {} and cannot move to {}",
                    program.status.label(),
                    to.label()
                ));
            }
            Ok(ProgramPatch {
                status: Some(to),
                ..ProgramPatch::default()
            })
        })
        .await?;
    Ok(())
}

// Workouts

pub async fn workouts_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Html<String> {
    let flash = notice_flash(query.notice.as_deref());
    workouts_with_flash(&state, &user, flash.as_ref()).await
}

async fn workouts_with_flash(state: &AppState, user: &str, flash: Option<&Flash>) -> Html<String> {
    let workouts = state.gateway.list::<Workout>(user).await;
    Html(ui::render_workouts(
        user,
        &workouts,
        state.list_mode == ListMode::Live,
        flash,
    ))
}

pub async fn new_workout(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Redirect {
    let id = state.open_draft(&user, Draft::workout()).await;
    Redirect::to(&format!("/drafts/{id}"))
}

pub async fn edit_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Redirect {
    match load_workout(&state, &user, query.id.as_deref()).await {
        Some(workout) => {
            let id = state.open_draft(&user, Draft::from_workout(&workout)).await;
            Redirect::to(&format!("/drafts/{id}"))
        }
        None => Redirect::to("/workouts"),
    }
}

pub async fn start_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    match load_workout(&state, &user, query.id.as_deref()).await {
        Some(workout) => Html(ui::render_workout_session(&user, &workout, None)).into_response(),
        None => Redirect::to("/workouts").into_response(),
    }
}

pub async fn complete_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    mark_workout_page(&state, &user, query.id.as_deref(), true).await
}

pub async fn incomplete_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    mark_workout_page(&state, &user, query.id.as_deref(), false).await
}

async fn mark_workout_page(state: &AppState, user: &str, id: Option<&str>, completed: bool) -> Response {
    let Some(id) = id else {
        return Redirect::to("/workouts").into_response();
    };
    match set_workout_completed(state, user, id, completed).await {
        Ok(()) => Redirect::to("/workouts").into_response(),
        Err(err) => {
            let verb = if completed { "complete" } else { "incomplete" };
            let flash = Flash::error(format!("Error marking workout {verb}: {}", err.message));
            (err.status, workouts_with_flash(state, user, Some(&flash)).await).into_response()
        }
    }
}

pub async fn confirm_delete_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    match load_workout(&state, &user, query.id.as_deref()).await {
        Some(workout) => Html(ui::render_confirm_delete(
            &user,
            "workout",
            &workout.name,
            &format!("/workouts/delete?id={}", workout.id),
            "/workouts",
        ))
        .into_response(),
        None => Redirect::to("/workouts").into_response(),
    }
}

pub async fn delete_workout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IdQuery>,
) -> Response {
    let Some(id) = query.id else {
        return Redirect::to("/workouts").into_response();
    };
    match state.gateway.delete::<Workout>(&user, &id).await {
        Ok(()) => Redirect::to("/workouts?notice=deleted").into_response(),
        Err(err) => {
            let err = AppError::from(err);
            let flash = Flash::error(format!("Error deleting workout: {}", err.message));
            (err.status, workouts_with_flash(&state, &user, Some(&flash)).await).into_response()
        }
    }
}

async fn load_workout(state: &AppState, user: &str, id: Option<&str>) -> Option<Workout> {
    let id = id?;
    match state.gateway.get::<Workout>(user, id).await {
        Ok(workout) => Some(workout),
        Err(err) => {
            debug!("workout lookup failed: {err}");
            None
        }
    }
}

pub(crate) async fn set_workout_completed(
    state: &AppState,
    user: &str,
    id: &str,
    completed: bool,
) -> Result<(), AppError> {
    let patch = WorkoutPatch {
        completed: Some(completed),
        completed_at: Some(completed.then(Utc::now)),
        ..WorkoutPatch::default()
    };
    state.gateway.update::<Workout>(user, id, patch).await?;
    Ok(())
}

// Drafts

pub async fn draft_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Response {
    match state.draft(&user, id).await {
        Some(draft) => Html(ui::render_draft(&user, id, &draft, None)).into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// Syncs every posted field into the draft, then performs the clicked op.
pub async fn draft_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let Some(mut draft) = state.draft(&user, id).await else {
        return Redirect::to("/").into_response();
    };

    let submission = match FormSubmission::parse(&fields, draft.is_program()) {
        Ok(submission) => submission,
        Err(message) => return draft_with_error(&user, id, &draft, StatusCode::BAD_REQUEST, message),
    };
    let mut rejected = None;
    for action in submission.fields {
        match draft.apply(action) {
            Ok(()) => {}
            Err(DraftError::UnknownNode(node)) => debug!(%node, "ignoring field of removed node"),
            Err(err) => {
                rejected.get_or_insert(err);
            }
        }
    }
    if let Some(err) = rejected {
        state.store_draft(&user, id, draft.clone()).await;
        let err = AppError::from(err);
        return draft_with_error(&user, id, &draft, err.status, err.message);
    }

    match submission.op {
        FormOp::Save => {
            state.store_draft(&user, id, draft).await;
            Redirect::to(&format!("/drafts/{id}")).into_response()
        }
        FormOp::Edit(action) => {
            let result = draft.apply(action);
            state.store_draft(&user, id, draft.clone()).await;
            match result {
                Ok(()) => Redirect::to(&format!("/drafts/{id}")).into_response(),
                Err(err) => {
                    let err = AppError::from(err);
                    draft_with_error(&user, id, &draft, err.status, err.message)
                }
            }
        }
        FormOp::Submit => {
            state.store_draft(&user, id, draft.clone()).await;
            match save_draft(&state, &user, &draft).await {
                Ok(saved) => {
                    state.close_draft(&user, id).await;
                    let target = match saved.collection {
                        Collection::Programs => format!("/programs/view?id={}", saved.id),
                        Collection::Workouts => "/workouts?notice=saved".to_string(),
                    };
                    Redirect::to(&target).into_response()
                }
                Err(err) => draft_with_error(&user, id, &draft, err.status, err.message),
            }
        }
    }
}

fn draft_with_error(user: &str, id: Uuid, draft: &Draft, status: StatusCode, message: String) -> Response {
    let flash = Flash::error(message);
    (status, Html(ui::render_draft(user, id, draft, Some(&flash)))).into_response()
}

/// Validates the draft and writes it: `create` for a new draft, `update`
/// when it was opened from an existing record. Nothing is written when
/// validation fails.
pub(crate) async fn save_draft(state: &AppState, user: &str, draft: &Draft) -> Result<Saved, AppError> {
    let collected = match collect::submit(draft) {
        Ok(collected) => collected,
        Err(err) => {
            debug!("draft rejected: {err}");
            return Err(err.into());
        }
    };
    let saved = match (collected, draft.record_id.as_deref()) {
        (Collected::Program(program), None) => Saved {
            collection: Collection::Programs,
            id: state.gateway.create::<Program>(user, program).await?,
        },
        (Collected::Program(program), Some(id)) => {
            state.gateway.update::<Program>(user, id, program.into()).await?;
            Saved {
                collection: Collection::Programs,
                id: id.to_string(),
            }
        }
        (Collected::Workout(workout), None) => Saved {
            collection: Collection::Workouts,
            id: state.gateway.create::<Workout>(user, workout).await?,
        },
        (Collected::Workout(workout), Some(id)) => {
            state.gateway.update::<Workout>(user, id, workout.into()).await?;
            Saved {
                collection: Collection::Workouts,
                id: id.to_string(),
            }
        }
    };
    Ok(saved)
}

fn notice_flash(notice: Option<&str>) -> Option<Flash> {
    match notice? {
        "deleted" => Some(Flash::ok("Deleted successfully")),
        "saved" => Some(Flash::ok("Saved successfully")),
        other => {
            warn!(notice = other, "unknown notice code");
            None
        }
    }
}
