pub mod extract;
pub mod health;
pub mod sessions;

use axum::{
    routing::{get, post},
    Router,
};

use crate::middleware::{auth::require_bearer_auth, rate_limit::rps_middleware};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let session_api = Router::new()
        .route("/api/sessions", post(sessions::start_session))
        .route("/api/sessions/:id", get(sessions::get_session_status))
        .route(
            "/api/sessions/:id/questions/:number",
            get(sessions::fetch_question),
        )
        .route(
            "/api/sessions/:id/answers",
            post(sessions::submit_answer).put(sessions::save_answer),
        )
        .route("/api/sessions/:id/finish", post(sessions::finish_session))
        .route("/api/sessions/:id/result", get(sessions::get_session_result))
        .route("/api/tests/:test_id/status", get(sessions::get_test_status))
        .layer(axum::middleware::from_fn_with_state(
            state.limiter.clone(),
            rps_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.verifier.clone(),
            require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(session_api)
        .with_state(state)
}
