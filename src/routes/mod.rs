//! Route modules for the Dossier server

pub mod auth;
pub mod dossier;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::session::{session_id_from_cookie, Session};
use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().server.max_upload_bytes;

    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(dossier::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the session named by the request cookie, refreshing its idle timer
pub(crate) async fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let id = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(session_id_from_cookie)?;
    state.sessions().touch(id).await
}

/// Like [`current_session`] but only for sessions that passed the gate
pub(crate) async fn authenticated_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    current_session(state, headers)
        .await
        .filter(|session| session.authenticated)
}
