//! Application state management

use std::sync::Arc;

use crate::batch::TextExtractor;
use crate::config::Config;
use crate::form::FormController;
use crate::ocr::OcrService;
use crate::repository::RepositoryHandle;
use crate::session::{SessionGate, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    sessions: SessionStore,
    gate: SessionGate,
    ocr: Arc<OcrService>,
    controller: FormController,
    repository: RepositoryHandle,
}

impl AppState {
    /// Create the application state with the configured OCR providers
    pub fn new(config: Config) -> Self {
        let ocr = Arc::new(OcrService::new(&config.ocr));
        Self::with_ocr(config, ocr.clone(), ocr)
    }

    /// Create the application state with an explicit extractor (used by tests)
    pub fn with_ocr(config: Config, ocr: Arc<OcrService>, extractor: Arc<dyn TextExtractor>) -> Self {
        let gate = SessionGate::new(&config.auth.password);
        let repository = RepositoryHandle::new(config.repository.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions: SessionStore::new(),
                gate,
                ocr,
                controller: FormController::new(extractor),
                repository,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the session store
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// Get the password gate
    pub fn gate(&self) -> &SessionGate {
        &self.inner.gate
    }

    /// Get the OCR service
    pub fn ocr(&self) -> &OcrService {
        &self.inner.ocr
    }

    /// Get the form controller
    pub fn controller(&self) -> &FormController {
        &self.inner.controller
    }

    /// Get the cached remote repository handle
    pub fn repository(&self) -> &RepositoryHandle {
        &self.inner.repository
    }
}
