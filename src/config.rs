//! Configuration management for the Dossier server

use serde::Deserialize;
use std::env;

use crate::ocr::OcrProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub ocr: OcrConfig,
    pub repository: Option<RepositoryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole multipart submission
    pub max_upload_bytes: usize,
    /// Idle sessions older than this are purged
    pub session_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret checked by the session gate
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language set, e.g. "por+eng"
    pub languages: String,
    /// Provider preference order
    pub providers: Vec<OcrProvider>,
    pub tesseract_cmd: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    pub api_url: String,
    pub owner: String,
    pub name: String,
    pub token: String,
}

/// Errors raised while reading configuration from the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

pub const DEFAULT_OCR_LANGUAGES: &str = "por+eng";

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8501,
                max_upload_bytes: 32 * 1024 * 1024,
                session_ttl_minutes: 120,
            },
            auth: AuthConfig {
                password: "changeme".to_string(),
            },
            ocr: OcrConfig::default(),
            repository: None,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_OCR_LANGUAGES.to_string(),
            providers: vec![OcrProvider::Tesseract],
            tesseract_cmd: "tesseract".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let password = env::var("DOSSIER_PASSWORD").map_err(|_| ConfigError::Missing("DOSSIER_PASSWORD"))?;
        if password.is_empty() {
            return Err(ConfigError::Invalid {
                name: "DOSSIER_PASSWORD",
                value: "<empty>".to_string(),
            });
        }

        let providers = match env::var("OCR_PROVIDERS") {
            Ok(raw) => parse_providers(&raw)?,
            Err(_) => defaults.ocr.providers.clone(),
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes)?,
                session_ttl_minutes: parse_var("SESSION_TTL_MINUTES", defaults.server.session_ttl_minutes)?,
            },
            auth: AuthConfig { password },
            ocr: OcrConfig {
                languages: env::var("OCR_LANGUAGES").unwrap_or(defaults.ocr.languages),
                providers,
                tesseract_cmd: env::var("TESSERACT_CMD").unwrap_or(defaults.ocr.tesseract_cmd),
                ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
            },
            repository: repository_from_env(),
        })
    }
}

/// The repository is optional: all four variables must be present to enable it
fn repository_from_env() -> Option<RepositoryConfig> {
    let owner = env::var("REPOSITORY_OWNER").ok()?;
    let name = env::var("REPOSITORY_NAME").ok()?;
    let token = env::var("REPOSITORY_TOKEN").ok()?;

    Some(RepositoryConfig {
        api_url: env::var("REPOSITORY_API_URL").unwrap_or_else(|_| "https://api.github.com".to_string()),
        owner,
        name,
        token,
    })
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_providers(raw: &str) -> Result<Vec<OcrProvider>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.to_ascii_lowercase().as_str() {
            "tesseract" => Ok(OcrProvider::Tesseract),
            "ollama" => Ok(OcrProvider::Ollama),
            _ => Err(ConfigError::Invalid {
                name: "OCR_PROVIDERS",
                value: s.to_string(),
            }),
        })
        .collect()
}
