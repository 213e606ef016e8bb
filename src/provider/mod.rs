//! Upstream image provider integration
//!
//! The proxy forwards each prompt to a hosted text-to-image model. The only
//! production implementation talks to Cloudflare Workers AI.

pub mod client;
pub mod mock;

pub use client::CloudflareClient;
pub use mock::MockImageProvider;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Run `model` on `prompt` and return the raw image bytes.
    async fn generate_image(&self, prompt: &str, model: &str) -> Result<Vec<u8>>;
}
