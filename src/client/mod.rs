//! Client request component
//!
//! Turns one user action into exactly one generation request and hands the
//! outcome to a presentation layer. The same component talks either to the
//! relay proxy or straight to the provider, depending on [`ClientConfig`].

pub mod config;
pub mod generator;
pub mod mock;
pub mod object_urls;
pub mod saver;
pub mod terminal;

pub use config::{ClientConfig, Target};
pub use generator::{ClientState, ImageGenerator};
pub use mock::{MockImageSaver, PresenterEvent, RecordingPresenter};
pub use object_urls::{ImageHandle, ObjectUrls};
pub use saver::FileSaver;
pub use terminal::TerminalPresenter;

use crate::Result;

/// Hooks the generator drives. Implementations own all rendering.
pub trait Presenter: Send + Sync {
    fn on_loading_changed(&self, loading: bool);
    fn on_result(&self, image: &ImageHandle);
    fn on_error(&self, message: &str);

    /// The previous result and error are no longer current.
    fn on_cleared(&self) {}
}

/// Client-side save mechanism used by [`ImageGenerator::download`].
pub trait ImageSaver: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()>;
}
