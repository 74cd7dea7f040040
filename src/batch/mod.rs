//! Batch Grouper
//!
//! Runs every uploaded image of every labelled group through a [`TextExtractor`]
//! and stitches the results into one text block:
//!
//! ```text
//! --- INÍCIO: CLASSIFICAÇÃO ---
//! <text of image 1>
//! <text of image 2>
//! --- FIM: CLASSIFICAÇÃO ---
//! --- INÍCIO: ESTATÍSTICAS ---
//! ...
//! ```
//!
//! Groups are emitted in the order given and images in upload order. Extraction
//! is sequential and all-or-nothing: the first failing image aborts the batch.

use async_trait::async_trait;
use axum::body::Bytes;

use crate::ocr::{OcrError, OcrService};

/// One uploaded file
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub data: Bytes,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// A labelled, ordered collection of uploads
#[derive(Debug, Clone)]
pub struct ImageGroup {
    pub label: String,
    pub images: Vec<UploadedImage>,
}

impl ImageGroup {
    pub fn new(label: impl Into<String>, images: Vec<UploadedImage>) -> Self {
        Self {
            label: label.into(),
            images,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Something that turns one image into text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, image: &UploadedImage) -> Result<String, OcrError>;
}

#[async_trait]
impl TextExtractor for OcrService {
    async fn extract(&self, image: &UploadedImage) -> Result<String, OcrError> {
        self.extract_text(&image.data).await.map(|result| result.text)
    }
}

/// Batch extraction errors
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Failed to read image {index} ({file_name}) in group {group}: {source}")]
    Extraction {
        group: String,
        /// 1-based position within the group
        index: usize,
        file_name: String,
        #[source]
        source: OcrError,
    },
}

pub fn start_marker(label: &str) -> String {
    format!("--- INÍCIO: {} ---\n", label)
}

pub fn end_marker(label: &str) -> String {
    format!("--- FIM: {} ---\n", label)
}

/// Labels of the groups that have no images
pub fn empty_groups(groups: &[ImageGroup]) -> Vec<String> {
    groups
        .iter()
        .filter(|group| group.is_empty())
        .map(|group| group.label.clone())
        .collect()
}

/// Extract and concatenate the text of every image, group by group
pub async fn extract_groups(
    extractor: &dyn TextExtractor,
    groups: &[ImageGroup],
) -> Result<String, BatchError> {
    let mut block = String::new();

    for group in groups {
        block.push_str(&start_marker(&group.label));

        for (position, image) in group.images.iter().enumerate() {
            let text = extractor
                .extract(image)
                .await
                .map_err(|source| BatchError::Extraction {
                    group: group.label.clone(),
                    index: position + 1,
                    file_name: image.file_name.clone(),
                    source,
                })?;

            tracing::debug!(
                group = %group.label,
                file_name = %image.file_name,
                chars = text.len(),
                "Extracted image text"
            );

            block.push_str(&text);
            block.push('\n');
        }

        block.push_str(&end_marker(&group.label));
    }

    Ok(block)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Deterministic extractor keyed by file name
    #[derive(Default)]
    pub struct StubExtractor {
        pub texts: HashMap<String, String>,
        pub failing: Option<String>,
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<String>>,
    }

    impl StubExtractor {
        pub fn with_texts(pairs: &[(&str, &str)]) -> Self {
            Self {
                texts: pairs
                    .iter()
                    .map(|(name, text)| (name.to_string(), text.to_string()))
                    .collect(),
                ..Default::default()
            }
        }

        pub fn failing_on(mut self, file_name: &str) -> Self {
            self.failing = Some(file_name.to_string());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextExtractor for StubExtractor {
        async fn extract(&self, image: &UploadedImage) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(image.file_name.clone());

            if self.failing.as_deref() == Some(image.file_name.as_str()) {
                return Err(OcrError::DecodeError("corrupt".to_string()));
            }

            Ok(self.texts.get(&image.file_name).cloned().unwrap_or_default())
        }
    }

    pub fn image(name: &str) -> UploadedImage {
        UploadedImage::new(name, Bytes::from_static(b"raw"))
    }
}
