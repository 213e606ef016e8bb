//! Data models and structures
//!
//! Defines the wire payloads exchanged between the client, the proxy and the
//! upstream image API, plus process configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "black-forest-labs/flux-1-schnell";
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com";
pub const DEFAULT_IMAGE_SIZE: u32 = 1024;
pub const DEFAULT_PORT: u16 = 3000;
pub const PROMPT_REQUIRED: &str = "Prompt is required";
pub const GENERATION_FAILED: &str = "Failed to generate image";

/// Body of `POST /api/generate-image`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            model: Some(model.into()),
        }
    }

    /// Trimmed prompt, or `None` when missing or blank.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Requested model, falling back to `default` when missing or blank.
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(default)
    }
}

/// Structured error body returned by the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Request body for the provider's `ai/run/<model>` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<f32>,
}

impl UpstreamImageRequest {
    pub fn new(prompt: impl Into<String>, size: ImageSize) -> Self {
        Self {
            prompt: prompt.into(),
            width: size.width,
            height: size.height,
            steps: None,
            guidance: None,
        }
    }

    pub fn with_tuning(mut self, steps: u32, guidance: f32) -> Self {
        self.steps = Some(steps);
        self.guidance = Some(guidance);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_IMAGE_SIZE,
            height: DEFAULT_IMAGE_SIZE,
        }
    }
}

/// JSON envelope some Workers AI models answer with instead of raw bytes.
#[derive(Debug, Deserialize)]
pub struct UpstreamEnvelope {
    pub result: Option<UpstreamResult>,
    #[serde(default)]
    pub success: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamResult {
    pub image: Option<String>,
}

// Configuration
#[derive(Clone)]
pub struct Config {
    pub account_id: String,
    pub api_token: String,
    pub api_base_url: String,
    pub default_model: String,
    pub image_size: ImageSize,
    pub upstream_timeout: Option<Duration>,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("default_model", &self.default_model)
            .field("image_size", &self.image_size)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

impl Config {
    /// Config with the given credentials and every optional value at its default.
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            image_size: ImageSize::default(),
            upstream_timeout: None,
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("public"),
        }
    }

    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (environment, map in tests).
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| crate::Error::Config(format!("{} not set", key)))
        };

        Ok(Self {
            account_id: required("CLOUDFLARE_ACCOUNT_ID")?,
            api_token: required("CLOUDFLARE_API_TOKEN")?,
            api_base_url: lookup("CLOUDFLARE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            default_model: lookup("DEFAULT_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            image_size: ImageSize {
                width: parse_or(&lookup, "IMAGE_WIDTH", DEFAULT_IMAGE_SIZE)?,
                height: parse_or(&lookup, "IMAGE_HEIGHT", DEFAULT_IMAGE_SIZE)?,
            },
            upstream_timeout: lookup("UPSTREAM_TIMEOUT_SECS")
                .map(|v| parse_value::<u64>("UPSTREAM_TIMEOUT_SECS", &v))
                .transpose()?
                .map(Duration::from_secs),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
        })
    }

    /// Provider endpoint prefix; the model identifier is appended per request.
    pub fn run_url(&self) -> String {
        format!(
            "{}/client/v4/accounts/{}/ai/run",
            self.api_base_url.trim_end_matches('/'),
            self.account_id
        )
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> crate::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| crate::Error::Config(format!("{} has invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_generation_request_model_is_optional() {
        let req: GenerationRequest = serde_json::from_str(r#"{"prompt":"a cat"}"#).unwrap();
        assert_eq!(req.prompt(), Some("a cat"));
        assert_eq!(req.model_or(DEFAULT_MODEL), DEFAULT_MODEL);

        let req: GenerationRequest =
            serde_json::from_str(r#"{"prompt":"a cat","model":"  "}"#).unwrap();
        assert_eq!(req.model_or(DEFAULT_MODEL), DEFAULT_MODEL);
    }

    #[test]
    fn test_generation_request_blank_prompt_is_missing() {
        let req: GenerationRequest = serde_json::from_str(r#"{"prompt":"   "}"#).unwrap();
        assert_eq!(req.prompt(), None);

        let req: GenerationRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.prompt(), None);
    }

    #[test]
    fn test_error_body_skips_missing_details() {
        let json = serde_json::to_string(&ErrorBody::new(PROMPT_REQUIRED)).unwrap();
        assert_eq!(json, r#"{"error":"Prompt is required"}"#);

        let json =
            serde_json::to_string(&ErrorBody::new(GENERATION_FAILED).with_details("503")).unwrap();
        assert!(json.contains("\"details\":\"503\""));
    }

    #[test]
    fn test_upstream_request_omits_unset_tuning() {
        let json =
            serde_json::to_value(UpstreamImageRequest::new("a cat", ImageSize::default())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"prompt": "a cat", "width": 1024, "height": 1024})
        );

        let json = serde_json::to_value(
            UpstreamImageRequest::new("a cat", ImageSize::default()).with_tuning(20, 7.5),
        )
        .unwrap();
        assert_eq!(json["steps"], 20);
        assert_eq!(json["guidance"], 7.5);
    }

    #[test]
    fn test_config_requires_credentials() {
        let err = Config::from_lookup(lookup_from(&[("CLOUDFLARE_ACCOUNT_ID", "acct")]))
            .unwrap_err();
        assert!(err.to_string().contains("CLOUDFLARE_API_TOKEN"));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLOUDFLARE_ACCOUNT_ID", "acct"),
            ("CLOUDFLARE_API_TOKEN", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.image_size, ImageSize::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.upstream_timeout.is_none());
        assert_eq!(
            config.run_url(),
            "https://api.cloudflare.com/client/v4/accounts/acct/ai/run"
        );
    }

    #[test]
    fn test_config_overrides_and_invalid_numbers() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLOUDFLARE_ACCOUNT_ID", "acct"),
            ("CLOUDFLARE_API_TOKEN", "secret"),
            ("CLOUDFLARE_API_BASE_URL", "http://localhost:9999/"),
            ("IMAGE_WIDTH", "512"),
            ("UPSTREAM_TIMEOUT_SECS", "45"),
        ]))
        .unwrap();
        assert_eq!(config.image_size.width, 512);
        assert_eq!(config.upstream_timeout, Some(Duration::from_secs(45)));
        assert_eq!(
            config.run_url(),
            "http://localhost:9999/client/v4/accounts/acct/ai/run"
        );

        let err = Config::from_lookup(lookup_from(&[
            ("CLOUDFLARE_ACCOUNT_ID", "acct"),
            ("CLOUDFLARE_API_TOKEN", "secret"),
            ("PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLOUDFLARE_ACCOUNT_ID", "acct"),
            ("CLOUDFLARE_API_TOKEN", "super-secret"),
        ]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
