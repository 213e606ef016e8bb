use super::{ImageHandle, Presenter};
use tracing::{error, info};

/// Presentation layer for the `generate` subcommand: everything goes to the log.
#[derive(Debug, Default)]
pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn on_loading_changed(&self, loading: bool) {
        if loading {
            info!("Generating...");
        }
    }

    fn on_result(&self, image: &ImageHandle) {
        info!(
            "Image ready: {} ({} bytes)",
            image.url(),
            image.bytes().len()
        );
    }

    fn on_error(&self, message: &str) {
        error!("{}", message);
    }
}
