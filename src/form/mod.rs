//! Form Controller
//!
//! Owns the submit/reset state machine of the dossier form:
//!
//! ```text
//! Empty --submit(valid)--> Validating --ok--> Ready --reset--> Empty
//!   ^                          |
//!   |                          +--error--> Failed (no prompt held)
//!   +--submit(invalid): stays, extractor never called
//! ```
//!
//! The state lives in the caller's [`Session`](crate::session::Session); the
//! controller itself is stateless apart from its extractor.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::batch::{self, BatchError, ImageGroup, TextExtractor};
use crate::prompt::{self, ContextFields, RenderedPrompt};
use crate::session::SessionStore;

/// Label of the league table screenshots
pub const TABLE_GROUP: &str = "CLASSIFICAÇÃO";
/// Label of the statistics screenshots
pub const STATS_GROUP: &str = "ESTATÍSTICAS";

/// Form state held per session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormState {
    #[default]
    Empty,
    Validating,
    Failed(String),
    Ready(RenderedPrompt),
}

impl FormState {
    pub fn prompt(&self) -> Option<&RenderedPrompt> {
        match self {
            FormState::Ready(prompt) => Some(prompt),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FormState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Raw submission as collected from the form
#[derive(Debug, Clone, Default)]
pub struct FormSubmission {
    pub season: String,
    pub league: String,
    pub country: String,
    /// Required image groups, in the order they appear in the prompt
    pub groups: Vec<ImageGroup>,
}

impl FormSubmission {
    /// Submission with the two standard groups
    pub fn new(
        season: impl Into<String>,
        league: impl Into<String>,
        country: impl Into<String>,
        table_images: Vec<batch::UploadedImage>,
        stats_images: Vec<batch::UploadedImage>,
    ) -> Self {
        Self {
            season: season.into(),
            league: league.into(),
            country: country.into(),
            groups: vec![
                ImageGroup::new(TABLE_GROUP, table_images),
                ImageGroup::new(STATS_GROUP, stats_images),
            ],
        }
    }
}

/// Submission that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub fields: ContextFields,
    pub groups: Vec<ImageGroup>,
}

/// Missing required inputs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Preencha todos os campos obrigatórios: {}", missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<String>,
}

/// Form controller errors
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Erro ao processar as imagens: {0}")]
    Extraction(#[from] BatchError),

    #[error("Uma submissão já está em processamento nesta sessão")]
    Busy,

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("{0}")]
    Aborted(String),
}

/// Drives validation, extraction and prompt assembly
#[derive(Clone)]
pub struct FormController {
    extractor: Arc<dyn TextExtractor>,
}

impl FormController {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    /// Check every required field and group, reporting all gaps at once
    pub fn validate(submission: FormSubmission) -> Result<ValidatedSubmission, ValidationError> {
        let season = submission.season.trim();
        let league = submission.league.trim();
        let country = submission.country.trim();

        let mut missing = Vec::new();
        for (name, value) in [("Temporada", season), ("Liga", league), ("País", country)] {
            if value.is_empty() {
                missing.push(name.to_string());
            }
        }
        if submission.groups.is_empty() {
            missing.push("Imagens".to_string());
        }
        missing.extend(batch::empty_groups(&submission.groups));

        if !missing.is_empty() {
            return Err(ValidationError { missing });
        }

        Ok(ValidatedSubmission {
            fields: ContextFields {
                season: season.to_string(),
                league: league.to_string(),
                country: country.to_string(),
            },
            groups: submission.groups,
        })
    }

    /// Handle a submit action for `session_id`.
    ///
    /// `today` is stamped into the prompt as the generation date.
    pub async fn submit(
        &self,
        store: &SessionStore,
        session_id: Uuid,
        submission: FormSubmission,
        today: NaiveDate,
    ) -> Result<RenderedPrompt, FormError> {
        let validated = match Self::validate(submission) {
            Ok(validated) => validated,
            Err(e) => {
                // A stale error is dropped, a held prompt is kept
                store
                    .update(session_id, |session| {
                        if matches!(session.form, FormState::Failed(_)) {
                            session.form = FormState::Empty;
                        }
                    })
                    .await
                    .ok_or(FormError::SessionNotFound(session_id))?;
                tracing::info!(session_id = %session_id, missing = ?e.missing, "Submission rejected");
                return Err(e.into());
            }
        };

        let claimed = store
            .update(session_id, |session| {
                if session.form == FormState::Validating {
                    false
                } else {
                    session.form = FormState::Validating;
                    true
                }
            })
            .await
            .ok_or(FormError::SessionNotFound(session_id))?;
        if !claimed {
            return Err(FormError::Busy);
        }

        let image_count: usize = validated.groups.iter().map(|g| g.images.len()).sum();
        tracing::info!(
            session_id = %session_id,
            league = %validated.fields.league,
            season = %validated.fields.season,
            images = image_count,
            "Processing submission"
        );

        // The task owns the final state change, so a dropped request still
        // leaves the session in Ready or Failed
        let extractor = self.extractor.clone();
        let task_store = store.clone();
        let task = tokio::spawn(async move {
            let outcome = batch::extract_groups(extractor.as_ref(), &validated.groups)
                .await
                .map(|block| prompt::assemble(&validated.fields, today, &block));

            let next = match &outcome {
                Ok(prompt) => FormState::Ready(prompt.clone()),
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Submission failed");
                    FormState::Failed(format!("Erro ao processar as imagens: {}", e))
                }
            };
            task_store.update(session_id, |session| session.form = next).await;

            outcome
        });

        match task.await {
            Ok(outcome) => outcome.map_err(FormError::from),
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Submission task aborted");
                let message = format!("Processamento interrompido: {}", e);
                store
                    .update(session_id, |session| session.form = FormState::Failed(message.clone()))
                    .await;
                Err(FormError::Aborted(message))
            }
        }
    }

    /// Drop any held prompt or error
    pub async fn reset(&self, store: &SessionStore, session_id: Uuid) -> Result<(), FormError> {
        store
            .update(session_id, |session| session.form = FormState::Empty)
            .await
            .ok_or(FormError::SessionNotFound(session_id))?;
        tracing::debug!(session_id = %session_id, "Form reset");
        Ok(())
    }

    /// The prompt held by the session, if it is in `Ready`
    pub async fn current_prompt(store: &SessionStore, session_id: Uuid) -> Option<RenderedPrompt> {
        store
            .get(session_id)
            .await
            .and_then(|session| session.form.prompt().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::testing::{image, StubExtractor};
    use crate::prompt::SKELETON_HEADERS;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn scenario() -> FormSubmission {
        FormSubmission::new(
            "2024-2025",
            "HOL",
            "Holanda",
            vec![image("tabela.png")],
            vec![image("stats.png")],
        )
    }

    async fn setup(stub: StubExtractor) -> (Arc<StubExtractor>, FormController, SessionStore, Uuid) {
        let stub = Arc::new(stub);
        let controller = FormController::new(stub.clone());
        let store = SessionStore::new();
        let session = store.create().await;
        (stub, controller, store, session.id)
    }

    #[tokio::test]
    async fn test_scenario_reaches_ready() {
        let (_, controller, store, id) =
            setup(StubExtractor::with_texts(&[("tabela.png", "TABLE_A"), ("stats.png", "STATS_A")])).await;

        let prompt = controller.submit(&store, id, scenario(), today()).await.unwrap();

        assert!(prompt.text.contains("Liga para Análise: HOL"));
        assert!(prompt.text.contains("TABLE_A"));
        assert!(prompt.text.contains("STATS_A"));
        assert!(prompt.text.contains("2024-2025"));
        assert!(prompt.text.contains("Holanda"));
        assert!(prompt.text.contains("15/01/2025"));
        for header in SKELETON_HEADERS {
            assert_eq!(prompt.text.matches(header).count(), 1);
        }

        let session = store.get(id).await.unwrap();
        assert_eq!(session.form, FormState::Ready(prompt));
    }

    #[tokio::test]
    async fn test_missing_field_never_calls_extractor() {
        let (stub, controller, store, id) = setup(StubExtractor::default()).await;
        let mut submission = scenario();
        submission.league = "   ".to_string();

        let err = controller.submit(&store, id, submission, today()).await.unwrap_err();

        match err {
            FormError::Validation(e) => assert_eq!(e.missing, vec!["Liga".to_string()]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stub.call_count(), 0);
        assert_eq!(store.get(id).await.unwrap().form, FormState::Empty);
    }

    #[tokio::test]
    async fn test_missing_group_never_calls_extractor() {
        let (stub, controller, store, id) = setup(StubExtractor::default()).await;
        let submission = FormSubmission::new("2024-2025", "", "Holanda", vec![image("t.png")], vec![]);

        let err = controller.submit(&store, id, submission, today()).await.unwrap_err();

        match err {
            FormError::Validation(e) => {
                assert_eq!(e.missing, vec!["Liga".to_string(), STATS_GROUP.to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stub.call_count(), 0);
        assert!(FormController::current_prompt(&store, id).await.is_none());
    }

    #[tokio::test]
    async fn test_extraction_failure_leaves_no_prompt() {
        let (_, controller, store, id) = setup(
            StubExtractor::with_texts(&[("tabela.png", "TABLE_A"), ("stats.png", "STATS_A")])
                .failing_on("stats.png"),
        )
        .await;

        let err = controller.submit(&store, id, scenario(), today()).await.unwrap_err();

        assert!(matches!(err, FormError::Extraction(_)));
        let session = store.get(id).await.unwrap();
        let message = session.form.error().unwrap();
        assert!(message.contains("stats.png"));
        assert!(!message.contains("TABLE_A"));
        assert!(session.form.prompt().is_none());
    }

    #[tokio::test]
    async fn test_reset_clears_prompt() {
        let (_, controller, store, id) = setup(StubExtractor::default()).await;
        controller.submit(&store, id, scenario(), today()).await.unwrap();
        assert!(FormController::current_prompt(&store, id).await.is_some());

        controller.reset(&store, id).await.unwrap();

        assert!(FormController::current_prompt(&store, id).await.is_none());
        assert_eq!(store.get(id).await.unwrap().form, FormState::Empty);
    }

    #[tokio::test]
    async fn test_busy_session_rejects_second_submit() {
        let (stub, controller, store, id) = setup(StubExtractor::default()).await;
        store.update(id, |s| s.form = FormState::Validating).await;

        let err = controller.submit(&store, id, scenario(), today()).await.unwrap_err();

        assert!(matches!(err, FormError::Busy));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_submit_keeps_ready_prompt() {
        let (stub, controller, store, id) =
            setup(StubExtractor::with_texts(&[("tabela.png", "TABLE_A"), ("stats.png", "STATS_A")])).await;
        let prompt = controller.submit(&store, id, scenario(), today()).await.unwrap();

        let mut invalid = scenario();
        invalid.country = String::new();
        let err = controller.submit(&store, id, invalid, today()).await.unwrap_err();

        assert!(matches!(err, FormError::Validation(_)));
        assert_eq!(store.get(id).await.unwrap().form, FormState::Ready(prompt));
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_submit_clears_stale_failure() {
        let (_, controller, store, id) = setup(StubExtractor::default().failing_on("stats.png")).await;
        controller.submit(&store, id, scenario(), today()).await.unwrap_err();
        assert!(store.get(id).await.unwrap().form.error().is_some());

        let mut invalid = scenario();
        invalid.season = " ".to_string();
        let err = controller.submit(&store, id, invalid, today()).await.unwrap_err();

        assert!(matches!(err, FormError::Validation(_)));
        assert_eq!(store.get(id).await.unwrap().form, FormState::Empty);
    }

    /// Extractor that takes a while per image
    struct SlowExtractor;

    #[async_trait::async_trait]
    impl TextExtractor for SlowExtractor {
        async fn extract(&self, image: &batch::UploadedImage) -> Result<String, crate::ocr::OcrError> {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            Ok(image.file_name.clone())
        }
    }

    #[tokio::test]
    async fn test_dropped_submit_still_settles_state() {
        let controller = FormController::new(Arc::new(SlowExtractor));
        let store = SessionStore::new();
        let id = store.create().await.id;

        let dropped = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            controller.submit(&store, id, scenario(), today()),
        )
        .await;
        assert!(dropped.is_err());

        // Wait for the detached extraction to commit
        let mut form = store.get(id).await.unwrap().form;
        for _ in 0..50 {
            if form != FormState::Validating {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            form = store.get(id).await.unwrap().form;
        }
        assert!(form.prompt().is_some(), "state after dropped request: {form:?}");

        let prompt = controller.submit(&store, id, scenario(), today()).await.unwrap();
        assert!(prompt.text.contains("tabela.png"));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (_, controller, store, _) = setup(StubExtractor::default()).await;

        let err = controller.reset(&store, Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, FormError::SessionNotFound(_)));
    }
}
