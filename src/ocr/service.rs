//! OCR Service
//!
//! Orchestrates OCR providers and normalizes uploaded images before recognition.

use std::io::Cursor;
use std::sync::Arc;

use super::{
    provider::{OcrProviderTrait, OllamaProvider, TesseractProvider},
    types::{OcrError, OcrProvider, OcrResult},
};
use crate::config::OcrConfig;

/// OCR service for uploaded screenshots
pub struct OcrService {
    languages: String,
    providers: Vec<Arc<dyn OcrProviderTrait>>,
}

impl OcrService {
    /// Create a new OCR service from configuration
    pub fn new(config: &OcrConfig) -> Self {
        let mut providers: Vec<Arc<dyn OcrProviderTrait>> = Vec::new();

        for provider in &config.providers {
            match provider {
                OcrProvider::Tesseract => {
                    #[cfg(feature = "ocr-tesseract")]
                    providers.push(Arc::new(super::provider::NativeTesseractProvider));

                    #[cfg(not(feature = "ocr-tesseract"))]
                    providers.push(Arc::new(TesseractProvider::new(&config.tesseract_cmd)));
                }
                OcrProvider::Ollama => {
                    providers.push(Arc::new(OllamaProvider::new(
                        &config.ollama_url,
                        &config.ollama_model,
                    )));
                }
            }
        }

        Self::with_providers(&config.languages, providers)
    }

    /// Create a service over an explicit provider list
    pub fn with_providers(languages: &str, providers: Vec<Arc<dyn OcrProviderTrait>>) -> Self {
        Self {
            languages: languages.to_string(),
            providers,
        }
    }

    /// The fixed language set passed to every provider
    pub fn languages(&self) -> &str {
        &self.languages
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProvider> {
        let mut available = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                available.push(provider.provider_type());
            }
        }
        available
    }

    /// Decode an uploaded image and recognize its text.
    ///
    /// Any raster format the `image` crate understands is accepted; it is
    /// re-encoded as PNG so every provider sees the same input.
    pub async fn extract_text(&self, image_data: &[u8]) -> Result<OcrResult, OcrError> {
        let png = normalize_image(image_data)?;
        self.recognize(&png).await
    }

    /// Perform OCR on an already normalized PNG
    pub async fn recognize(&self, image_png: &[u8]) -> Result<OcrResult, OcrError> {
        let mut last_error = None;

        // Try providers in order
        for provider in &self.providers {
            if !provider.is_available().await {
                continue;
            }
            match provider.recognize(image_png, &self.languages).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(
                        "OCR provider {:?} failed: {}, trying next",
                        provider.provider_type(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OcrError::ProviderNotAvailable("No OCR providers available".to_string())
        }))
    }
}

/// Decode arbitrary raster bytes and re-encode them as PNG
fn normalize_image(image_data: &[u8]) -> Result<Vec<u8>, OcrError> {
    let img = image::load_from_memory(image_data).map_err(|e| OcrError::DecodeError(e.to_string()))?;

    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| OcrError::DecodeError(format!("Failed to encode image: {}", e)))?;

    Ok(buffer)
}

#[cfg(test)]
fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::provider::MockProvider;

    fn mock(provider: OcrProvider, response: Result<&str, &str>, available: bool) -> Arc<dyn OcrProviderTrait> {
        Arc::new(MockProvider {
            provider,
            response: response.map(str::to_string).map_err(str::to_string),
            available,
        })
    }

    #[tokio::test]
    async fn test_undecodable_image_is_rejected() {
        let service = OcrService::with_providers("por+eng", vec![mock(OcrProvider::Tesseract, Ok("x"), true)]);

        let result = service.extract_text(b"not an image").await;

        assert!(matches!(result, Err(OcrError::DecodeError(_))));
    }

    #[tokio::test]
    async fn test_languages_are_passed_to_provider() {
        let service = OcrService::with_providers("por+eng", vec![mock(OcrProvider::Tesseract, Ok("TABELA"), true)]);

        let result = service.extract_text(&sample_png()).await.unwrap();

        assert_eq!(result.text, "TABELA [por+eng]");
        assert_eq!(result.provider, OcrProvider::Tesseract);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let service = OcrService::with_providers(
            "por+eng",
            vec![
                mock(OcrProvider::Tesseract, Err("boom"), true),
                mock(OcrProvider::Ollama, Ok("fallback"), true),
            ],
        );

        let result = service.extract_text(&sample_png()).await.unwrap();

        assert_eq!(result.provider, OcrProvider::Ollama);
    }

    #[tokio::test]
    async fn test_last_error_is_reported() {
        let service = OcrService::with_providers("por+eng", vec![mock(OcrProvider::Tesseract, Err("boom"), true)]);

        let result = service.extract_text(&sample_png()).await;

        match result {
            Err(OcrError::ProcessingError(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_available_provider() {
        let service = OcrService::with_providers("por+eng", vec![mock(OcrProvider::Ollama, Ok("x"), false)]);

        assert!(service.available_providers().await.is_empty());
        let result = service.extract_text(&sample_png()).await;
        assert!(matches!(result, Err(OcrError::ProviderNotAvailable(_))));
    }
}
