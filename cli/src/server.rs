// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! HTTP gateway: one route per operation kind, plus health and saved images.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use llm_gateway_core::{
    llm::{LLMError, OpenRouterClient, OperationKind},
    utils::{ImageStoreError, is_data_uri, save_data_uri},
};

const SERVICE_NAME: &str = "LLM Gateway API";

/// Shared handler state. The client holds no mutable state, so one instance
/// serves every request.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<OpenRouterClient>,
    pub image_dir: PathBuf,
    pub default_prompt: String,
}

impl AppState {
    pub fn new(client: OpenRouterClient) -> Self {
        let image_dir = client.config().image.output_dir.clone();
        let default_prompt = client.config().server.default_prompt.clone();
        Self {
            client: Arc::new(client),
            image_dir,
            default_prompt,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptRequest {
    pub prompt: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: Option<String>,
    pub model: Option<String>,
    #[serde(default = "default_save_local")]
    pub save_local: bool,
}

fn default_save_local() -> bool {
    true
}

/// Transport-level status for a classified adapter error
pub fn status_for(err: &LLMError) -> StatusCode {
    match err {
        LLMError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        LLMError::TimeoutError(_) => StatusCode::GATEWAY_TIMEOUT,
        LLMError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LLMError::NetworkError(_)
        | LLMError::UpstreamHttpError { .. }
        | LLMError::UpstreamApiError { .. }
        | LLMError::MalformedResponse(_)
        | LLMError::UnexpectedShape(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Error body returned by every handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    detail: String,
}

impl ApiError {
    fn missing_prompt() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_input",
            detail: "The 'prompt' field is required".to_string(),
        }
    }
}

impl From<LLMError> for ApiError {
    fn from(err: LLMError) -> Self {
        Self {
            status: status_for(&err),
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_input",
            detail: rejection.body_text(),
        }
    }
}

impl From<ImageStoreError> for ApiError {
    fn from(err: ImageStoreError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "image_store_error",
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{} ({}): {}", self.status, self.kind, self.detail);
        } else {
            warn!("{} ({}): {}", self.status, self.kind, self.detail);
        }
        (
            self.status,
            Json(json!({"success": false, "kind": self.kind, "detail": self.detail})),
        )
            .into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let images = ServeDir::new(&state.image_dir);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat/llm", post(chat_llm))
        .route("/chat/reasoner", post(chat_reasoner))
        .route("/image/generate", post(generate_image))
        .nest_service("/images", images)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": format!("Welcome to the {}", SERVICE_NAME),
        "endpoints": {
            "/health": "API status",
            "/chat/llm": "Chat with the text model (POST)",
            "/chat/reasoner": "Chat with the reasoning model (POST)",
            "/image/generate": "Generate an image (POST)",
            "/images/{filename}": "Saved images (GET)"
        },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "client_initialized": true,
    }))
}

async fn chat(
    state: &AppState,
    prompt: String,
    model: Option<String>,
    kind: OperationKind,
) -> Result<Json<Value>, ApiError> {
    let model = model.unwrap_or_else(|| state.client.default_model(kind).to_string());
    info!("POST {} request for model {}", kind, model);

    let response = state
        .client
        .invoke(&prompt, &model, kind, None)
        .await?
        .into_inner();

    Ok(Json(json!({
        "success": true,
        "prompt": prompt,
        "response": response,
        "model": model,
    })))
}

async fn chat_llm(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let prompt = body.prompt.ok_or_else(ApiError::missing_prompt)?;
    chat(&state, prompt, body.model, OperationKind::Text).await
}

async fn chat_reasoner(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let prompt = body
        .prompt
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.default_prompt.clone());
    chat(&state, prompt, body.model, OperationKind::Reasoning).await
}

async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let prompt = body.prompt.ok_or_else(ApiError::missing_prompt)?;
    let model = body
        .model
        .unwrap_or_else(|| state.client.default_model(OperationKind::Image).to_string());
    info!("POST image request for model {}", model);

    let image = state
        .client
        .invoke(&prompt, &model, OperationKind::Image, None)
        .await?
        .into_inner();

    let mut result = json!({
        "success": true,
        "prompt": prompt,
        "model": model,
    });

    if body.save_local && is_data_uri(&image) {
        let dir = state.image_dir.clone();
        let path = tokio::task::spawn_blocking(move || save_data_uri(&image, &dir))
            .await
            .map_err(|e| ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                kind: "image_store_error",
                detail: format!("spawn_blocking panicked: {e}"),
            })??;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        result["guide"] = json!(format!("To view the image open /images/{}", filename));
        result["filename"] = json!(filename);
    } else {
        result["guide"] = json!(if is_data_uri(&image) {
            "The image was not saved locally. Send \"save_local\": true to store it."
        } else {
            "The image is hosted upstream at image_url."
        });
        result["image_url"] = json!(image);
    }

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use llm_gateway_core::config::{GatewayConfig, ModelProvider};
    use llm_gateway_core::llm::{LLMResult, RetryConfig, Transport, UpstreamReply, UpstreamRequest};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    struct StubTransport {
        reply: LLMResult<UpstreamReply>,
        requests: Mutex<Vec<UpstreamRequest>>,
    }

    impl StubTransport {
        fn new(status: u16, body: Value) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(UpstreamReply { status, body: body.to_string() }),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn post_json(&self, request: UpstreamRequest) -> LLMResult<UpstreamReply> {
            self.requests.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn app(transport: Arc<StubTransport>, image_dir: PathBuf) -> Router {
        let provider = ModelProvider::default().with_api_key("test_key".to_string());
        let config = GatewayConfig::new(provider)
            .with_image_dir(image_dir)
            .with_retry(RetryConfig {
                max_attempts: 2,
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(1),
                multiplier: 1.0,
            });
        let client = OpenRouterClient::with_transport(config, transport).unwrap();
        build_router(AppState::new(client))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn text_reply(content: &str) -> Value {
        json!({"choices": [{"message": {"content": content}}]})
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&LLMError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&LLMError::TimeoutError("x".into())), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(&LLMError::ConfigError("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_for(&LLMError::UpstreamHttpError { status_code: 500, body: String::new() }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_for(&LLMError::UnexpectedShape("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&LLMError::MalformedResponse("x".into())), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(StubTransport::new(200, text_reply("ok")), dir.path().to_path_buf());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_chat_llm() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(StubTransport::new(200, text_reply("Hello there")), dir.path().to_path_buf());

        let response = app
            .oneshot(post("/chat/llm", json!({"prompt": "Hi", "model": "x-ai/grok-4-fast"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["response"], "Hello there");
        assert_eq!(body["model"], "x-ai/grok-4-fast");
    }

    #[tokio::test]
    async fn test_missing_and_blank_prompt_are_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StubTransport::new(200, text_reply("unused"));

        let response = app(transport.clone(), dir.path().to_path_buf())
            .oneshot(post("/chat/llm", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(transport.clone(), dir.path().to_path_buf())
            .oneshot(post("/image/generate", json!({"prompt": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["kind"], "invalid_input");

        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_json_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StubTransport::new(200, text_reply("unused"));

        let response = app(transport.clone(), dir.path().to_path_buf())
            .oneshot(post("/chat/llm", json!({"prompt": 5})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "invalid_input");

        let malformed = Request::builder()
            .method("POST")
            .uri("/image/generate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app(transport.clone(), dir.path().to_path_buf())
            .oneshot(malformed)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["kind"], "invalid_input");

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/chat/reasoner")
            .body(Body::from(r#"{"prompt": "hi"}"#))
            .unwrap();
        let response = app(transport.clone(), dir.path().to_path_buf())
            .oneshot(no_content_type)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["success"], false);

        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(StubTransport::new(500, json!({"detail": "boom"})), dir.path().to_path_buf());

        let response = app.oneshot(post("/chat/llm", json!({"prompt": "Hi"}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "upstream_http_error");
    }

    #[tokio::test]
    async fn test_reasoner_falls_back_to_default_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StubTransport::new(200, text_reply("42"));
        let app = app(transport.clone(), dir.path().to_path_buf());

        let response = app.oneshot(post("/chat/reasoner", json!({}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["prompt"], "Hello! I'm testing responses via the API");
        let sent = transport.requests.lock().unwrap()[0].body.clone();
        assert_eq!(sent["messages"][0]["content"], "Hello! I'm testing responses via the API");
    }

    #[tokio::test]
    async fn test_image_is_saved_and_served() {
        let dir = tempfile::tempdir().unwrap();
        let reply = json!({"choices": [{"message": {"images": [
            {"image_url": {"url": "data:image/png;base64,aGVsbG8="}}
        ]}}]});
        let app = app(StubTransport::new(200, reply), dir.path().to_path_buf());

        let response = app
            .clone()
            .oneshot(post("/image/generate", json!({"prompt": "a cat"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        let filename = body["filename"].as_str().unwrap().to_string();
        assert!(filename.ends_with(".png"));
        assert_eq!(std::fs::read(dir.path().join(&filename)).unwrap(), b"hello");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/images/{}", filename))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_image_url_is_returned_when_not_saving() {
        let dir = tempfile::tempdir().unwrap();
        let reply = json!({"choices": [{"message": {}}], "data": [{"url": "https://cdn.example.org/cat.png"}]});
        let app = app(StubTransport::new(200, reply), dir.path().to_path_buf());

        let response = app
            .oneshot(post("/image/generate", json!({"prompt": "a cat", "save_local": false})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["image_url"], "https://cdn.example.org/cat.png");
        assert!(body.get("filename").is_none());
    }
}
