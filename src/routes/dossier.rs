//! Dossier form routes
//!
//! Endpoints:
//! - GET /                          - Main page (form, result or error)
//! - POST /dossier                  - Submit the form (multipart)
//! - POST /dossier/reset            - Drop the held prompt
//! - POST /api/v1/dossier           - Submit the form, JSON response
//! - GET /api/v1/dossier/prompt     - Read the held prompt
//! - POST /api/v1/dossier/reset     - Drop the held prompt, JSON response

use axum::{
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

use super::authenticated_session;
use crate::batch::UploadedImage;
use crate::error::{AppError, Result};
use crate::form::{FormController, FormError, FormSubmission};
use crate::html::{self, Tab};
use crate::prompt::RenderedPrompt;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(main_page))
        .route("/dossier", post(submit_form))
        .route("/dossier/reset", post(reset_form))
        .route("/api/v1/dossier", post(submit_api))
        .route("/api/v1/dossier/prompt", get(get_prompt))
        .route("/api/v1/dossier/reset", post(reset_api))
}

// ============================================================================
// Multipart
// ============================================================================

/// Field names used by the HTML form
pub mod fields {
    pub const SEASON: &str = "temporada";
    pub const LEAGUE: &str = "liga";
    pub const COUNTRY: &str = "pais";
    pub const TABLE_IMAGES: &str = "classificacao";
    pub const STATS_IMAGES: &str = "estatisticas";
}

/// Collect the form fields and uploads; unknown fields are ignored
async fn read_submission(mut multipart: Multipart) -> Result<FormSubmission> {
    let mut season = String::new();
    let mut league = String::new();
    let mut country = String::new();
    let mut table_images = Vec::new();
    let mut stats_images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;

        match name.as_str() {
            fields::SEASON => season = String::from_utf8_lossy(&data).into_owned(),
            fields::LEAGUE => league = String::from_utf8_lossy(&data).into_owned(),
            fields::COUNTRY => country = String::from_utf8_lossy(&data).into_owned(),
            fields::TABLE_IMAGES | fields::STATS_IMAGES => {
                // Browsers send an empty part when no file was picked
                if data.is_empty() {
                    continue;
                }
                let position = if name == fields::TABLE_IMAGES {
                    table_images.len()
                } else {
                    stats_images.len()
                } + 1;
                let image = UploadedImage::new(
                    file_name.unwrap_or_else(|| format!("{}-{}", name, position)),
                    data,
                );
                if name == fields::TABLE_IMAGES {
                    table_images.push(image);
                } else {
                    stats_images.push(image);
                }
            }
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(FormSubmission::new(season, league, country, table_images, stats_images))
}

// ============================================================================
// HTML handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub tab: Option<String>,
}

/// GET /
async fn main_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    let Some(session) = authenticated_session(&state, &headers).await else {
        return Redirect::to("/login").into_response();
    };

    let tab = query
        .tab
        .as_deref()
        .and_then(Tab::from_slug)
        .unwrap_or(Tab::LeagueDossier);

    Html(html::main_page(tab, &session.form, None)).into_response()
}

/// POST /dossier
async fn submit_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response> {
    let Some(session) = authenticated_session(&state, &headers).await else {
        return Ok(Redirect::to("/login").into_response());
    };

    let submission = read_submission(multipart).await?;
    let today = Local::now().date_naive();

    match state
        .controller()
        .submit(state.sessions(), session.id, submission, today)
        .await
    {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(e @ (FormError::Validation(_) | FormError::Busy)) => {
            let message = e.to_string();
            let status = AppError::from(e).status_code();
            let form = current_form(&state, session.id).await;
            Ok((status, Html(html::main_page(Tab::LeagueDossier, &form, Some(&message)))).into_response())
        }
        Err(FormError::Extraction(_) | FormError::Aborted(_)) => {
            // The failure message is stored on the session
            let form = current_form(&state, session.id).await;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(html::main_page(Tab::LeagueDossier, &form, None)),
            )
                .into_response())
        }
        Err(e @ FormError::SessionNotFound(_)) => Err(e.into()),
    }
}

/// POST /dossier/reset
async fn reset_form(State(state): State<AppState>, headers: HeaderMap) -> Result<Redirect> {
    let Some(session) = authenticated_session(&state, &headers).await else {
        return Ok(Redirect::to("/login"));
    };

    state.controller().reset(state.sessions(), session.id).await?;
    Ok(Redirect::to("/"))
}

async fn current_form(state: &AppState, id: uuid::Uuid) -> crate::form::FormState {
    state
        .sessions()
        .get(id)
        .await
        .map(|session| session.form)
        .unwrap_or_default()
}

// ============================================================================
// JSON handlers
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<RenderedPrompt>,
}

/// POST /api/v1/dossier
async fn submit_api(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<PromptResponse>> {
    let session = authenticated_session(&state, &headers)
        .await
        .ok_or(AppError::Unauthorized)?;

    let submission = read_submission(multipart).await?;
    let prompt = state
        .controller()
        .submit(state.sessions(), session.id, submission, Local::now().date_naive())
        .await?;

    Ok(Json(PromptResponse {
        present: true,
        prompt: Some(prompt),
    }))
}

/// GET /api/v1/dossier/prompt
async fn get_prompt(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<PromptResponse>> {
    let session = authenticated_session(&state, &headers)
        .await
        .ok_or(AppError::Unauthorized)?;

    let prompt = FormController::current_prompt(state.sessions(), session.id).await;

    Ok(Json(PromptResponse {
        present: prompt.is_some(),
        prompt,
    }))
}

/// POST /api/v1/dossier/reset
async fn reset_api(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    let session = authenticated_session(&state, &headers)
        .await
        .ok_or(AppError::Unauthorized)?;

    state.controller().reset(state.sessions(), session.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
