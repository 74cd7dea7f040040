//! Login gate routes

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use super::current_session;
use crate::html;
use crate::session::session_cookie;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

/// GET /login
async fn login_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match current_session(&state, &headers).await {
        Some(session) if session.authenticated => Redirect::to("/").into_response(),
        Some(_) => Html(html::login_page(None)).into_response(),
        None => {
            let session = state.sessions().create().await;
            (
                [(header::SET_COOKIE, session_cookie(session.id))],
                Html(html::login_page(None)),
            )
                .into_response()
        }
    }
}

/// POST /login
///
/// A successful login always issues a new session id; the old one is dropped.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let previous = current_session(&state, &headers).await.map(|session| session.id);
    let outcome = state.gate().login(state.sessions(), previous, &form.password).await;
    let cookie = [(header::SET_COOKIE, session_cookie(outcome.session_id))];

    if outcome.authenticated {
        (cookie, Redirect::to("/")).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            cookie,
            Html(html::login_page(Some("Senha incorreta."))),
        )
            .into_response()
    }
}

/// POST /logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    if let Some(session) = current_session(&state, &headers).await {
        state.sessions().remove(session.id).await;
        tracing::info!(session_id = %session.id, "Session closed");
    }
    Redirect::to("/login")
}
