use axum::{extract::State, response::Json, Extension};
use uuid::Uuid;
use validator::Validate;

use crate::dto::session_dto::{
    QuestionResponse, ResultResponse, SaveAnswerResponse, SessionResponse, StartSessionRequest,
    StatusResponse, SubmissionResponse, SubmitAnswerRequest, TestStatusResponse,
};
use crate::error::Result;
use crate::models::role::Principal;
use crate::routes::extract::{ApiJson, ApiPath};
use crate::AppState;

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<StartSessionRequest>,
) -> Result<Json<SessionResponse>> {
    let student_id = principal.require_student()?;
    let session = state.engine.lifecycle.start(student_id, req.test_id).await?;
    Ok(Json(session.into()))
}

#[axum::debug_handler]
pub async fn get_session_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> Result<Json<StatusResponse>> {
    let student_id = principal.require_student()?;
    let progress = state.engine.lifecycle.status(session_id, student_id).await?;
    Ok(Json(progress.into()))
}

#[axum::debug_handler]
pub async fn fetch_question(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath((session_id, question_number)): ApiPath<(Uuid, i64)>,
) -> Result<Json<QuestionResponse>> {
    let student_id = principal.require_student()?;
    state
        .engine
        .lifecycle
        .owned_session(session_id, student_id)
        .await?;
    let found = state
        .engine
        .sequencer
        .fetch_by_number(session_id, question_number)
        .await?;
    Ok(Json(found.into()))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(session_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SubmitAnswerRequest>,
) -> Result<Json<SubmissionResponse>> {
    req.validate()?;
    let student_id = principal.require_student()?;
    state
        .engine
        .lifecycle
        .owned_session(session_id, student_id)
        .await?;
    let outcome = state
        .engine
        .answers
        .submit_and_advance(session_id, req.question_id, &req.selected_option)
        .await?;
    Ok(Json(outcome.into()))
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(session_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SubmitAnswerRequest>,
) -> Result<Json<SaveAnswerResponse>> {
    req.validate()?;
    let student_id = principal.require_student()?;
    state
        .engine
        .lifecycle
        .owned_session(session_id, student_id)
        .await?;
    let answer = state
        .engine
        .answers
        .submit_only(session_id, req.question_id, &req.selected_option)
        .await?;
    Ok(Json(answer.into()))
}

#[axum::debug_handler]
pub async fn finish_session(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> Result<Json<SessionResponse>> {
    let student_id = principal.require_student()?;
    let session = state.engine.lifecycle.finish(session_id, student_id).await?;
    Ok(Json(session.into()))
}

#[axum::debug_handler]
pub async fn get_session_result(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> Result<Json<ResultResponse>> {
    let student_id = principal.require_student()?;
    let result = state.engine.lifecycle.result(session_id, student_id).await?;
    Ok(Json(result.into()))
}

#[axum::debug_handler]
pub async fn get_test_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(test_id): ApiPath<Uuid>,
) -> Result<Json<TestStatusResponse>> {
    let student_id = principal.require_student()?;
    let status = state.engine.lifecycle.test_status(student_id, test_id).await?;
    Ok(Json(TestStatusResponse { test_id, status }))
}
