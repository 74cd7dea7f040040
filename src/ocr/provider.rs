//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::types::{OcrError, OcrProvider, OcrResult};

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProvider;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Perform OCR on a PNG-encoded image using a Tesseract-style language set ("por+eng")
    async fn recognize(&self, image_png: &[u8], languages: &str) -> Result<OcrResult, OcrError>;
}

/// Tesseract OCR provider driving the command line binary
pub struct TesseractProvider {
    command: String,
}

impl TesseractProvider {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, image_png: &[u8], languages: &str) -> Result<OcrResult, OcrError> {
        // stdin -> stdout avoids temp files
        let mut child = Command::new(&self.command)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(languages)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(image_png).await {
                Ok(()) => {}
                // Tesseract exited before reading everything; its stderr says why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!("Tesseract closed stdin early: {}", e);
                }
                Err(e) => {
                    return Err(OcrError::ProcessingError(format!(
                        "Failed to write image to tesseract: {}",
                        e
                    )));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to read tesseract output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(OcrResult {
            text: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            provider: OcrProvider::Tesseract,
        })
    }
}

/// In-process Tesseract through the libtesseract bindings
#[cfg(feature = "ocr-tesseract")]
pub struct NativeTesseractProvider;

#[cfg(feature = "ocr-tesseract")]
#[async_trait]
impl OcrProviderTrait for NativeTesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, image_png: &[u8], languages: &str) -> Result<OcrResult, OcrError> {
        let image = image_png.to_vec();
        let languages = languages.to_string();

        // libtesseract is blocking
        let text = tokio::task::spawn_blocking(move || -> Result<String, OcrError> {
            let mut tess = tesseract::Tesseract::new(None, Some(&languages))
                .map_err(|e| OcrError::ProviderNotAvailable(e.to_string()))?
                .set_image_from_mem(&image)
                .map_err(|e| OcrError::DecodeError(e.to_string()))?;
            tess.get_text()
                .map_err(|e| OcrError::ProcessingError(e.to_string()))
        })
        .await
        .map_err(|e| OcrError::ProcessingError(format!("OCR task panicked: {}", e)))??;

        Ok(OcrResult {
            text: text.trim().to_string(),
            provider: OcrProvider::Tesseract,
        })
    }
}

/// Ollama vision model provider
pub struct OllamaProvider {
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

/// Turns "por+eng" into a readable hint for a vision model
fn language_hint(languages: &str) -> String {
    let names: Vec<&str> = languages
        .split('+')
        .map(|code| match code {
            "por" => "Portuguese",
            "eng" => "English",
            "spa" => "Spanish",
            "nld" => "Dutch",
            other => other,
        })
        .collect();
    names.join(" or ")
}

#[async_trait]
impl OcrProviderTrait for OllamaProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(&self, image_png: &[u8], languages: &str) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/api/generate", self.base_url);
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_png);

        let prompt = format!(
            "Extract all text from this image exactly as written. The text is in {}. \
             Keep table rows on separate lines. Return only the extracted text, nothing else.",
            language_hint(languages)
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "images": [image_base64],
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        let text = result["response"].as_str().unwrap_or("").trim().to_string();

        Ok(OcrResult {
            text,
            provider: OcrProvider::Ollama,
        })
    }
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub provider: OcrProvider,
    pub response: Result<String, String>,
    pub available: bool,
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for MockProvider {
    fn provider_type(&self) -> OcrProvider {
        self.provider
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(&self, _image_png: &[u8], languages: &str) -> Result<OcrResult, OcrError> {
        match &self.response {
            Ok(text) => Ok(OcrResult {
                text: format!("{text} [{languages}]"),
                provider: self.provider,
            }),
            Err(message) => Err(OcrError::ProcessingError(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_hint() {
        assert_eq!(language_hint("por+eng"), "Portuguese or English");
        assert_eq!(language_hint("deu"), "deu");
    }

    #[tokio::test]
    async fn test_missing_tesseract_binary_is_unavailable() {
        let provider = TesseractProvider::new("definitely-not-a-tesseract-binary");
        assert!(!provider.is_available().await);

        let result = provider.recognize(b"png", "por+eng").await;
        assert!(matches!(result, Err(OcrError::ProcessingError(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_early_exit_reports_stderr() {
        // `sh stdin ...` fails to open a script named "stdin" without reading the pipe
        let provider = TesseractProvider::new("sh");
        let image = vec![0u8; 1 << 20];

        let result = provider.recognize(&image, "por+eng").await;

        match result {
            Err(OcrError::ProcessingError(message)) => {
                assert!(message.starts_with("Tesseract failed:"), "{}", message);
                assert!(message.contains("stdin"), "{}", message);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
