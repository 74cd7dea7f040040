//! OCR Module
//!
//! Turns uploaded league screenshots into plain text.
//!
//! Supports multiple backends:
//! - Tesseract (local binary, or in-process with the `ocr-tesseract` feature)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dossier_server::config::OcrConfig;
//! use dossier_server::ocr::OcrService;
//!
//! let service = OcrService::new(&OcrConfig::default());
//! let result = service.extract_text(&png_bytes).await?;
//! println!("{}", result.text);
//! ```

mod provider;
mod service;
mod types;

pub use provider::{OcrProviderTrait, OllamaProvider, TesseractProvider};
pub use service::OcrService;
pub use types::{OcrError, OcrProvider, OcrResult};

#[cfg(feature = "ocr-tesseract")]
pub use provider::NativeTesseractProvider;
