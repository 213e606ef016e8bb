use crate::models::{Config, ImageSize};
use crate::proxy::GENERATE_IMAGE_PATH;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use std::time::Duration;

/// Tuning sent with direct provider calls.
pub const DIRECT_STEPS: u32 = 20;
pub const DIRECT_GUIDANCE: f32 = 7.5;

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// POST `{prompt, model}` to a relay that owns the credential.
    Proxy,
    /// POST the provider payload to `<endpoint>/<model>`.
    Direct {
        image_size: ImageSize,
        steps: u32,
        guidance: f32,
    },
}

/// Where and how the generator sends its requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub headers: HeaderMap,
    pub target: Target,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Talk to a relay proxy. `base_url` is the proxy origin, e.g. `http://localhost:3000`.
    pub fn proxy(base_url: &str) -> Self {
        Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), GENERATE_IMAGE_PATH),
            headers: HeaderMap::new(),
            target: Target::Proxy,
            timeout: None,
        }
    }

    /// Call the provider directly with the credential from `config`.
    pub fn direct(config: &Config) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_token))
            .map_err(|_| Error::Config("API token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            endpoint: config.run_url(),
            headers,
            target: Target::Direct {
                image_size: config.image_size,
                steps: DIRECT_STEPS,
                guidance: DIRECT_GUIDANCE,
            },
            timeout: config.upstream_timeout,
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Config(format!("Invalid value for header '{}': {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
