use super::ImageProvider;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Tiny valid PNG returned when no response has been queued.
pub const MOCK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
    0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2, 0x25,
    0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug, Clone)]
enum MockResponse {
    Image(Vec<u8>),
    UpstreamStatus(u16),
    Internal(String),
}

#[derive(Clone)]
pub struct MockImageProvider {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockImageProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_image_response(self, response: Vec<u8>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(MockResponse::Image(response));
        self
    }

    /// Queue a failure shaped like a non-2xx answer from the provider.
    pub fn with_upstream_status(self, status: u16) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(MockResponse::UpstreamStatus(status));
        self
    }

    pub fn with_internal_error(self, message: String) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(MockResponse::Internal(message));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// `(prompt, model)` pairs in call order.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate_image(&self, prompt: &str, model: &str) -> Result<Vec<u8>> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((prompt.to_string(), model.to_string()));
            calls.len()
        };

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(MOCK_PNG.to_vec());
        }

        match &responses[(count - 1) % responses.len()] {
            MockResponse::Image(bytes) => Ok(bytes.clone()),
            MockResponse::UpstreamStatus(status) => Err(Error::Upstream {
                status: *status,
                message: format!("Cloudflare API error: {}", status),
            }),
            MockResponse::Internal(message) => Err(Error::Internal(message.clone())),
        }
    }
}
