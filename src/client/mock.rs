use super::{ImageHandle, ImageSaver, Presenter};
use crate::Result;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum PresenterEvent {
    Loading(bool),
    Result { url: String, bytes: Vec<u8> },
    Error(String),
    Cleared,
}

/// Presenter that records every hook call in order.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    events: Arc<Mutex<Vec<PresenterEvent>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_events(&self) -> Vec<PresenterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn get_errors(&self) -> Vec<String> {
        self.get_events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn get_results(&self) -> Vec<(String, Vec<u8>)> {
        self.get_events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Result { url, bytes } => Some((url, bytes)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: PresenterEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Presenter for RecordingPresenter {
    fn on_loading_changed(&self, loading: bool) {
        self.push(PresenterEvent::Loading(loading));
    }

    fn on_result(&self, image: &ImageHandle) {
        self.push(PresenterEvent::Result {
            url: image.url().to_string(),
            bytes: image.bytes().to_vec(),
        });
    }

    fn on_error(&self, message: &str) {
        self.push(PresenterEvent::Error(message.to_string()));
    }

    fn on_cleared(&self) {
        self.push(PresenterEvent::Cleared);
    }
}

/// Saver that keeps downloads in memory.
#[derive(Clone, Default)]
pub struct MockImageSaver {
    saved: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MockImageSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn get_saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().unwrap().clone()
    }
}

impl ImageSaver for MockImageSaver {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}
