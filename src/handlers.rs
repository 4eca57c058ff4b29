use crate::attendance::summarize;
use crate::bridge::Dispatch;
use crate::calendar::build_calendar;
use crate::errors::AppError;
use crate::models::{AttendanceResponse, CaseNote, Profile};
use crate::state::AppState;
use crate::ui::{render_page, PageView};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, Redirect},
    Json,
};
use chrono::Local;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let session = state.session.lock().await;
    let view = PageView::from_session(&session, Local::now().date_naive());
    Html(render_page(&state.template, &view, state.layout.as_ref()))
}

pub async fn load_contact(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, AppError> {
    let mut session = state.session.lock().await;
    session.load_contact_bytes(&body)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_case_note(State(state): State<AppState>, body: Bytes) -> Result<Json<CaseNote>, AppError> {
    let mut session = state.session.lock().await;
    let note = session.add_case_note_bytes(&body)?.clone();
    Ok(Json(note))
}

pub async fn request_case_note(State(state): State<AppState>) -> Json<Dispatch> {
    Json(dispatch_new_case_note(&state).await)
}

pub async fn case_note_form(State(state): State<AppState>) -> Redirect {
    dispatch_new_case_note(&state).await;
    Redirect::to("/")
}

pub async fn get_profile(State(state): State<AppState>) -> Json<Option<Profile>> {
    let session = state.session.lock().await;
    Json(session.profile().cloned())
}

pub async fn get_attendance(State(state): State<AppState>) -> Json<AttendanceResponse> {
    let session = state.session.lock().await;
    let events = session
        .profile()
        .map(|profile| profile.attendance.as_slice())
        .unwrap_or_default();

    Json(AttendanceResponse {
        summary: summarize(events),
        months: build_calendar(events),
    })
}

async fn dispatch_new_case_note(state: &AppState) -> Dispatch {
    // The session lock is not held across the host call.
    let dispatch = state.bridge.request_new_case_note().await;
    if dispatch != Dispatch::Failed {
        state.session.lock().await.set_notice(dispatch.notice());
    }
    dispatch
}
