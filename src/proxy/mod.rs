//! Proxy HTTP API
//!
//! Exposes `POST /api/generate-image`, attaches the provider credential on the
//! server side and relays the generated image bytes back to the caller.

pub mod server;

pub use server::serve;

use crate::models::{ErrorBody, GenerationRequest, GENERATION_FAILED, PROMPT_REQUIRED};
use crate::provider::ImageProvider;
use crate::Error;
use axum::{
    body::Bytes,
    extract::{Json, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, warn};

pub const GENERATE_IMAGE_PATH: &str = "/api/generate-image";

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn ImageProvider>,
    default_model: Arc<str>,
}

impl AppState {
    pub fn new(provider: Arc<dyn ImageProvider>, default_model: impl Into<String>) -> Self {
        Self {
            provider,
            default_model: default_model.into().into(),
        }
    }
}

/// Build the proxy router. When `static_dir` exists it is served for every
/// other path, so the front-end and the API share an origin.
pub fn create_app(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route(GENERATE_IMAGE_PATH, post(generate_image_handler))
        .with_state(state);

    if let Some(dir) = static_dir {
        if dir.is_dir() {
            app = app.fallback_service(ServeDir::new(dir));
        } else {
            warn!(
                "Static directory {} not found, serving API only",
                dir.display()
            );
        }
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// POST /api/generate-image
pub async fn generate_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Error> {
    let request = parse_request(&headers, &body)?;

    let prompt = request.prompt().ok_or_else(|| {
        warn!("Generate-image request without prompt");
        Error::Validation(PROMPT_REQUIRED.to_string())
    })?;
    let model = request.model_or(&state.default_model);

    debug!(
        "Image generation request received: prompt_len={}, model={}",
        prompt.len(),
        model
    );

    let image = state
        .provider
        .generate_image(prompt, model)
        .await
        .map_err(|e| {
            error!(
                "Server error: {} (upstream status: {:?}, model: {})",
                e,
                e.upstream_status(),
                model
            );
            e
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CONTENT_DISPOSITION, "inline"),
        ],
        image,
    )
        .into_response())
}

/// A missing body or a non-JSON content type reads as `{}`; only a JSON body
/// that fails to parse is rejected as malformed.
fn parse_request(headers: &HeaderMap, body: &[u8]) -> Result<GenerationRequest, Error> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            let mime = ct.split(';').next().unwrap_or_default().trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        });

    if !is_json || body.trim_ascii().is_empty() {
        return Ok(GenerationRequest::default());
    }

    Json::<GenerationRequest>::from_bytes(body)
        .map(|Json(request)| request)
        .map_err(|rejection| {
            warn!("Rejected generate-image body: {}", rejection.body_text());
            Error::Validation(format!("Invalid request body: {}", rejection.body_text()))
        })
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = match self {
            Error::Validation(message) => ErrorBody::new(message),
            other => ErrorBody::new(GENERATION_FAILED).with_details(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_MODEL;
    use crate::provider::MockImageProvider;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt; // for `oneshot`

    fn app_with(provider: &MockImageProvider) -> Router {
        let state = AppState::new(Arc::new(provider.clone()), DEFAULT_MODEL);
        create_app(state, None)
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(GENERATE_IMAGE_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_success_relays_image_bytes() {
        let image = vec![0x89, 0x50, 0x4E, 0x47, 0x01, 0x02, 0x03];
        let provider = MockImageProvider::new().with_image_response(image.clone());

        let response = app_with(&provider)
            .oneshot(json_request(r#"{"prompt":"a red fox","model":"@cf/lykon/dreamshaper-8-lcm"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::CONTENT_DISPOSITION], "inline");
        assert_eq!(body_bytes(response).await, image);
        assert_eq!(
            provider.get_calls(),
            vec![(
                "a red fox".to_string(),
                "@cf/lykon/dreamshaper-8-lcm".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_missing_model_uses_default() {
        let provider = MockImageProvider::new();

        let response = app_with(&provider)
            .oneshot(json_request(r#"{"prompt":"a red fox"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.get_calls()[0].1, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_missing_prompt_is_bad_request() {
        let provider = MockImageProvider::new();

        for body in [r#"{}"#, r#"{"model":"m"}"#, r#"{"prompt":""}"#, r#"{"prompt":"  "}"#] {
            let response = app_with(&provider)
                .oneshot(json_request(body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value =
                serde_json::from_slice(&body_bytes(response).await).unwrap();
            assert_eq!(body, serde_json::json!({"error": "Prompt is required"}));
        }
        assert_eq!(provider.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_body_reads_as_missing_prompt() {
        let provider = MockImageProvider::new();

        let requests = [
            Request::builder()
                .method("POST")
                .uri(GENERATE_IMAGE_PATH)
                .body(Body::empty())
                .unwrap(),
            Request::builder()
                .method("POST")
                .uri(GENERATE_IMAGE_PATH)
                .header("content-type", "application/json")
                .body(Body::empty())
                .unwrap(),
            Request::builder()
                .method("POST")
                .uri(GENERATE_IMAGE_PATH)
                .header("content-type", "text/plain")
                .body(Body::from(r#"{"prompt":"a red fox"}"#))
                .unwrap(),
        ];

        for request in requests {
            let response = app_with(&provider).oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value =
                serde_json::from_slice(&body_bytes(response).await).unwrap();
            assert_eq!(body, serde_json::json!({"error": "Prompt is required"}));
        }
        assert_eq!(provider.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_json_content_type_with_charset_is_parsed() {
        let provider = MockImageProvider::new();

        let response = app_with(&provider)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(GENERATE_IMAGE_PATH)
                    .header("content-type", "application/json; charset=utf-8")
                    .body(Body::from(r#"{"prompt":"a red fox"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.get_calls()[0].0, "a red fox");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let provider = MockImageProvider::new();

        let response = app_with(&provider)
            .oneshot(json_request("{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(body.error.starts_with("Invalid request body"));
        assert_eq!(provider.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_server_error_with_status() {
        let provider = MockImageProvider::new().with_upstream_status(503);

        let response = app_with(&provider)
            .oneshot(json_request(r#"{"prompt":"a red fox"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body.error, "Failed to generate image");
        assert!(body.details.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_internal_failure_is_server_error() {
        let provider = MockImageProvider::new()
            .with_internal_error("No image data in upstream response".to_string());

        let response = app_with(&provider)
            .oneshot(json_request(r#"{"prompt":"a red fox"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            body.details.as_deref(),
            Some("No image data in upstream response")
        );
    }

    #[tokio::test]
    async fn test_static_dir_is_served_as_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>imagegen</h1>").unwrap();

        let state = AppState::new(Arc::new(MockImageProvider::new()), DEFAULT_MODEL);
        let response = create_app(state, Some(dir.path()))
            .oneshot(
                Request::builder()
                    .uri("/index.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"<h1>imagegen</h1>");
    }
}
