use super::{ClientConfig, ImageHandle, ImageSaver, ObjectUrls, Presenter, Target};
use crate::mime::image_extension;
use crate::models::{ErrorBody, GenerationRequest, UpstreamImageRequest};
use crate::provider::client::{read_image_body, read_raw_image_body};
use crate::{Error, Result};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

pub const EMPTY_PROMPT: &str = "Please enter a description for the image.";
const FAILURE_PREFIX: &str = "Failed to generate image";

/// `Idle -> Loading -> {Displaying, ErrorShown}`; the next submit leaves
/// either terminal state through `Loading` again.
#[derive(Debug, Clone)]
pub enum ClientState {
    Idle,
    Loading,
    Displaying(ImageHandle),
    ErrorShown(String),
}

/// Drives one request per user action and reports the outcome to a [`Presenter`].
///
/// At most one request is in flight: a submit while `Loading` is refused with
/// [`Error::RequestInFlight`]. At most one object URL is held, and it is
/// revoked before a new request starts or when the generator is dropped.
pub struct ImageGenerator {
    http: Client,
    config: ClientConfig,
    presenter: Arc<dyn Presenter>,
    saver: Arc<dyn ImageSaver>,
    object_urls: ObjectUrls,
    state: Mutex<ClientState>,
    last_request: Mutex<Option<(String, String)>>,
}

impl ImageGenerator {
    pub fn new(
        config: ClientConfig,
        presenter: Arc<dyn Presenter>,
        saver: Arc<dyn ImageSaver>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config,
            presenter,
            saver,
            object_urls: ObjectUrls::new(),
            state: Mutex::new(ClientState::Idle),
            last_request: Mutex::new(None),
        })
    }

    pub fn state(&self) -> ClientState {
        self.lock_state().clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.lock_state(), ClientState::Loading)
    }

    pub fn object_urls(&self) -> &ObjectUrls {
        &self.object_urls
    }

    /// Generate an image for `prompt` with `model`.
    ///
    /// Every failure has already been reported through [`Presenter::on_error`]
    /// when this returns `Err`, except [`Error::RequestInFlight`], which is
    /// refused silently as a disabled submit control would be.
    pub async fn submit(&self, prompt: &str, model: &str) -> Result<()> {
        if self.is_loading() {
            return Err(Error::RequestInFlight);
        }

        let prompt = prompt.trim();
        if prompt.is_empty() {
            self.presenter.on_error(EMPTY_PROMPT);
            return Err(Error::Validation(EMPTY_PROMPT.to_string()));
        }

        let loading = self.begin_loading()?;
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((prompt.to_string(), model.to_string()));

        let outcome = match self.send(prompt, model).await {
            Ok(bytes) => {
                self.display(bytes);
                Ok(())
            }
            Err(e) => {
                let message = format!("{}: {}", FAILURE_PREFIX, e);
                error!("Error generating image: {}", e);
                *self.lock_state() = ClientState::ErrorShown(message.clone());
                self.presenter.on_error(&message);
                Err(e)
            }
        };

        drop(loading);
        outcome
    }

    /// Submit the last accepted prompt and model again.
    pub async fn regenerate(&self) -> Result<()> {
        let last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match last {
            Some((prompt, model)) => self.submit(&prompt, &model).await,
            None => {
                self.presenter.on_error(EMPTY_PROMPT);
                Err(Error::Validation(EMPTY_PROMPT.to_string()))
            }
        }
    }

    /// Save the displayed image. Returns the filename used, or `None` when no
    /// image is displayed.
    pub fn download(&self) -> Result<Option<String>> {
        let handle = match &*self.lock_state() {
            ClientState::Displaying(handle) => handle.clone(),
            _ => return Ok(None),
        };

        let filename = format!(
            "generated-image-{}.{}",
            Utc::now().timestamp_millis(),
            image_extension(handle.bytes())
        );
        self.saver.save(&filename, handle.bytes())?;
        info!("Downloaded {} as {}", handle.url(), filename);

        Ok(Some(filename))
    }

    /// Drop the displayed result or error and go back to `Idle`. No-op while loading.
    pub fn clear(&self) {
        let previous = {
            let mut state = self.lock_state();
            if matches!(*state, ClientState::Loading) {
                return;
            }
            std::mem::replace(&mut *state, ClientState::Idle)
        };
        self.release(previous);
        self.presenter.on_cleared();
    }

    fn begin_loading(&self) -> Result<LoadingGuard<'_>> {
        let previous = {
            let mut state = self.lock_state();
            if matches!(*state, ClientState::Loading) {
                return Err(Error::RequestInFlight);
            }
            std::mem::replace(&mut *state, ClientState::Loading)
        };

        self.release(previous);
        self.presenter.on_cleared();
        self.presenter.on_loading_changed(true);
        Ok(LoadingGuard { generator: self })
    }

    fn display(&self, bytes: Vec<u8>) {
        let handle = self.object_urls.create(bytes);
        *self.lock_state() = ClientState::Displaying(handle.clone());
        self.presenter.on_result(&handle);
    }

    fn release(&self, state: ClientState) {
        if let ClientState::Displaying(handle) = state {
            self.object_urls.revoke(handle.url());
        }
    }

    async fn send(&self, prompt: &str, model: &str) -> Result<Vec<u8>> {
        let request = match &self.config.target {
            Target::Proxy => self
                .http
                .post(&self.config.endpoint)
                .json(&GenerationRequest::new(prompt, model)),
            Target::Direct {
                image_size,
                steps,
                guidance,
            } => {
                let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), model);
                self.http.post(url).json(
                    &UpstreamImageRequest::new(prompt, *image_size).with_tuning(*steps, *guidance),
                )
            }
        };

        debug!("Sending generation request (model: {})", model);
        let response = request
            .headers(self.config.headers.clone())
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: self.failure_detail(status, &body),
            });
        }

        match self.config.target {
            Target::Proxy => read_raw_image_body(response).await,
            Target::Direct { .. } => read_image_body(response).await,
        }
    }

    /// The proxy explains failures in a JSON body; the provider's own body is not shown.
    fn failure_detail(&self, status: StatusCode, body: &str) -> String {
        let relayed = match self.config.target {
            Target::Proxy => serde_json::from_str::<ErrorBody>(body)
                .ok()
                .map(|b| b.details.unwrap_or(b.error)),
            Target::Direct { .. } => None,
        };
        relayed.unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()))
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ends a `Loading` phase, including when the `submit` future is dropped
/// before the request completes.
struct LoadingGuard<'a> {
    generator: &'a ImageGenerator,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.generator.lock_state();
            if matches!(*state, ClientState::Loading) {
                debug!("Generation abandoned before completion");
                *state = ClientState::Idle;
            }
        }
        self.generator.presenter.on_loading_changed(false);
    }
}

impl Drop for ImageGenerator {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let ClientState::Displaying(handle) = state {
            self.object_urls.revoke(handle.url());
        }
    }
}
