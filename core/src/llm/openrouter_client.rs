// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Client for OpenRouter-style chat completion APIs.
//!
//! One call is one POST to `{base_url}/chat/completions`; the reply is
//! classified and normalized into a [`NormalizedResult`]. Image generation is
//! retried with backoff, text calls are not.
//!
//! # Example usage
//!
//! ```no_run
//! use llm_gateway_core::config::{GatewayConfig, ModelProvider};
//! use llm_gateway_core::llm::{OpenRouterClient, OperationKind};
//!
//! # async fn run() -> Result<(), llm_gateway_core::llm::LLMError> {
//! let provider = ModelProvider::default().with_api_key("sk-or-v1-...".to_string());
//! let client = OpenRouterClient::new(GatewayConfig::new(provider))?;
//!
//! let result = client
//!     .invoke("Write a haiku about data", "google/gemini-2.0-flash-lite-001", OperationKind::Text, None)
//!     .await?;
//! println!("{}", result.into_inner());
//! # Ok(())
//! # }
//! ```

use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::llm::error::{LLMError, LLMResult};
use crate::llm::extract::normalize_response;
use crate::llm::llm_basics::{NormalizedResult, OperationKind, RequestPayload};
use crate::llm::retry_utils::{RetryConfig, retry_with_backoff};
use crate::llm::transport::{ReqwestTransport, Transport, UpstreamRequest};

/// Stateless adapter around the upstream completions endpoint
pub struct OpenRouterClient {
    transport: Arc<dyn Transport>,
    config: GatewayConfig,
    api_key: String,
}

impl OpenRouterClient {
    /// Create a client that talks to the network through reqwest
    pub fn new(config: GatewayConfig) -> LLMResult<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> LLMResult<Self> {
        let api_key = config
            .provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LLMError::ConfigError("API key not configured".to_string()))?
            .to_string();

        config
            .validate()
            .map_err(|e| LLMError::ConfigError(e.to_string()))?;

        info!(
            "{} client initialized for {}",
            config.provider.name,
            config.provider.completions_url()
        );

        Ok(Self {
            transport,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Default model configured for `kind`
    pub fn default_model(&self, kind: OperationKind) -> &str {
        self.config.models.for_kind(kind)
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        let mut extra: Vec<_> = self.config.provider.extra_headers.iter().collect();
        extra.sort();
        headers.extend(extra.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    fn retry_policy(&self, kind: OperationKind) -> RetryConfig {
        if kind.is_image() {
            self.config.retry.clone()
        } else {
            RetryConfig::none()
        }
    }

    /// Perform one upstream call (retried for images) and normalize the reply
    pub async fn invoke(
        &self,
        prompt: &str,
        model: &str,
        kind: OperationKind,
        extra_params: Option<&Map<String, Value>>,
    ) -> LLMResult<NormalizedResult> {
        if prompt.trim().is_empty() {
            warn!("Rejected {} call with an empty prompt", kind);
            return Err(LLMError::InvalidInput("prompt must not be empty".to_string()));
        }
        if model.trim().is_empty() {
            warn!("Rejected {} call without a model", kind);
            return Err(LLMError::InvalidInput("model must not be empty".to_string()));
        }

        let default_params;
        let extra_params = match (extra_params, kind) {
            (Some(params), _) => Some(params),
            (None, OperationKind::Image) => {
                default_params = self.config.image.output_format.extra_params();
                Some(&default_params)
            }
            (None, _) => None,
        };

        let request = UpstreamRequest {
            url: self.config.provider.completions_url(),
            headers: self.headers(),
            body: RequestPayload::new(prompt, model.trim(), extra_params).to_value(),
        };

        info!("Calling {} model {}", kind, model);
        let label = format!("{}:{}", self.config.provider.name, kind);
        retry_with_backoff(
            || self.call_once(&request, kind),
            &self.retry_policy(kind),
            &label,
        )
        .await
    }

    async fn call_once(&self, request: &UpstreamRequest, kind: OperationKind) -> LLMResult<NormalizedResult> {
        let reply = self.transport.post_json(request.clone()).await?;
        debug!("Normalizing {} reply with status {}", kind, reply.status);
        normalize_response(reply.status, &reply.body, kind)
    }

    async fn invoke_default(&self, prompt: &str, model: Option<&str>, kind: OperationKind) -> LLMResult<String> {
        let model = model.unwrap_or_else(|| self.default_model(kind));
        self.invoke(prompt, model, kind, None)
            .await
            .map(NormalizedResult::into_inner)
    }

    /// Text chat against the configured (or given) model
    pub async fn chat_llm(&self, prompt: &str, model: Option<&str>) -> LLMResult<String> {
        self.invoke_default(prompt, model, OperationKind::Text).await
    }

    /// Chat against the configured (or given) reasoning model
    pub async fn chat_reasoner(&self, prompt: &str, model: Option<&str>) -> LLMResult<String> {
        self.invoke_default(prompt, model, OperationKind::Reasoning).await
    }

    /// Generate an image, returning a URL or a `data:` URI
    pub async fn generate_image(&self, prompt: &str, model: Option<&str>) -> LLMResult<String> {
        self.invoke_default(prompt, model, OperationKind::Image).await
    }
}
