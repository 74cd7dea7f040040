//! Dossier Server Library
//!
//! A password-gated form that runs league screenshots through OCR and
//! assembles a research prompt for an external AI assistant. The binary in
//! `main.rs` wires these modules into an axum server.
//!
//! # Modules
//!
//! - `ocr`: OCR providers and the image normalizing service
//! - `batch`: Per-group extraction into one delimited text block
//! - `prompt`: The fixed prompt template
//! - `form`: Submit/reset state machine
//! - `session`: Password gate and in-memory sessions
//! - `repository`: Cached remote repository connection

pub mod batch;
pub mod config;
pub mod error;
pub mod form;
pub mod html;
pub mod ocr;
pub mod prompt;
pub mod repository;
pub mod routes;
pub mod session;
pub mod state;
