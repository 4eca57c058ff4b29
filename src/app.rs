use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/case-notes/new", post(handlers::case_note_form))
        .route("/api/contact", post(handlers::load_contact))
        .route("/api/case-notes", post(handlers::add_case_note))
        .route("/api/case-notes/new", post(handlers::request_case_note))
        .route("/api/profile", get(handlers::get_profile))
        .route("/api/attendance", get(handlers::get_attendance))
        .with_state(state)
}
