use crate::api;
use crate::handlers;
use crate::models::{Program, Workout};
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/auth", get(handlers::sign_in_page).post(handlers::sign_in))
        .route("/auth/sign-out", post(handlers::sign_out))
        .route("/programs", get(handlers::programs_page))
        .route("/programs/new", get(handlers::new_program))
        .route("/programs/view", get(handlers::view_program))
        .route("/programs/edit", get(handlers::edit_program))
        .route("/programs/start", post(handlers::start_program))
        .route("/programs/complete", post(handlers::complete_program))
        .route(
            "/programs/delete",
            get(handlers::confirm_delete_program).post(handlers::delete_program),
        )
        .route("/workouts", get(handlers::workouts_page))
        .route("/workouts/new", get(handlers::new_workout))
        .route("/workouts/edit", get(handlers::edit_workout))
        .route("/workouts/start", get(handlers::start_workout))
        .route("/workouts/complete", post(handlers::complete_workout))
        .route("/workouts/incomplete", post(handlers::incomplete_workout))
        .route(
            "/workouts/delete",
            get(handlers::confirm_delete_workout).post(handlers::delete_workout),
        )
        .route("/drafts/:id", get(handlers::draft_page).post(handlers::draft_post))
        .route("/api/programs", get(api::list_programs))
        .route("/api/programs/watch", get(api::watch::<Program>))
        .route(
            "/api/programs/:id",
            get(api::get_program).delete(api::delete_program),
        )
        .route("/api/programs/:id/start", post(api::start_program))
        .route("/api/programs/:id/complete", post(api::complete_program))
        .route("/api/workouts", get(api::list_workouts))
        .route("/api/workouts/watch", get(api::watch::<Workout>))
        .route(
            "/api/workouts/:id",
            get(api::get_workout).delete(api::delete_workout),
        )
        .route("/api/workouts/:id/complete", post(api::complete_workout))
        .route("/api/workouts/:id/incomplete", post(api::incomplete_workout))
        .route("/api/drafts/programs", post(api::new_program_draft))
        .route("/api/drafts/workouts", post(api::new_workout_draft))
        .route("/api/drafts/:id", get(api::get_draft))
        .route("/api/drafts/:id/actions", post(api::apply_draft_action))
        .route("/api/drafts/:id/submit", post(api::submit_draft))
        .with_state(state)
}
