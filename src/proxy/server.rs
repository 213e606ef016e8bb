use super::{create_app, AppState};
use crate::models::Config;
use crate::provider::CloudflareClient;
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Run the proxy until the process is stopped.
pub async fn serve(config: &Config, host: &str, static_dir: Option<&Path>) -> Result<()> {
    let provider = CloudflareClient::new(config)?;
    info!(
        "Image provider: Cloudflare Workers AI (default model: {})",
        config.default_model
    );

    let state = AppState::new(Arc::new(provider), config.default_model.clone());
    let app = create_app(state, static_dir);

    let listener = TcpListener::bind((host, config.port)).await?;
    info!("Server running on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
