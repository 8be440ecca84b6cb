// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;
use yaml_rust::{Yaml, YamlLoader};

use crate::llm::{ImageOutputFormat, OperationKind, RetryConfig};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TEXT_MODEL: &str = "google/gemini-2.0-flash-lite-001";
pub const DEFAULT_REASONING_MODEL: &str = "openai/gpt-oss-20b:free";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Config errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to load file: {0}")]
    LoadFileError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Upstream provider configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProvider {
    pub name: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub extra_headers: HashMap<String, String>,
}

impl ModelProvider {
    pub fn new(name: String) -> Self {
        Self {
            name,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            extra_headers: HashMap::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_extra_header(mut self, key: String, value: String) -> Self {
        self.extra_headers.insert(key, value);
        self
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ModelProvider {
    fn default() -> Self {
        Self::new("openrouter".to_string())
    }
}

/// Default model per operation kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefaults {
    pub text: String,
    pub reasoning: String,
    pub image: String,
}

impl ModelDefaults {
    pub fn for_kind(&self, kind: OperationKind) -> &str {
        match kind {
            OperationKind::Text => &self.text,
            OperationKind::Reasoning => &self.reasoning,
            OperationKind::Image => &self.image,
        }
    }
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            reasoning: DEFAULT_REASONING_MODEL.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

/// Image generation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    pub output_format: ImageOutputFormat,
    pub output_dir: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            output_format: ImageOutputFormat::default(),
            output_dir: PathBuf::from("images"),
        }
    }
}

/// HTTP gateway settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prompt used by the reasoner endpoint when the request omits one
    pub default_prompt: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            default_prompt: "Hello! I'm testing responses via the API".to_string(),
        }
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub provider: ModelProvider,
    pub models: ModelDefaults,
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub image: ImageConfig,
    pub server: ServerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(ModelProvider::default())
    }
}

fn get_str_value_or_none_from_yaml(item: &Yaml, key: &str) -> Option<String> {
    item[key].as_str().map(|value| value.to_string())
}

fn get_u64_value_or_none_from_yaml(item: &Yaml, key: &str) -> Result<Option<u64>, ConfigError> {
    match item[key].as_i64() {
        Some(value) if value < 0 => Err(ConfigError::InvalidValue(format!("{} must not be negative", key))),
        Some(value) => Ok(Some(value as u64)),
        None => Ok(None),
    }
}

fn get_f64_value_or_none_from_yaml(item: &Yaml, key: &str) -> Option<f64> {
    match item[key].as_f64() {
        Some(value) => Some(value),
        None => item[key].as_i64().map(|value| value as f64),
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidValue(format!("base_url {}: {}", base_url, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidValue(format!(
            "base_url must use http or https, got {}",
            scheme
        ))),
    }
}

fn validate_extra_headers(headers: &HashMap<String, String>) -> Result<(), ConfigError> {
    for (key, value) in headers {
        HeaderName::try_from(key.as_str())
            .map_err(|e| ConfigError::InvalidValue(format!("extra header name {:?}: {}", key, e)))?;
        HeaderValue::try_from(value.as_str())
            .map_err(|e| ConfigError::InvalidValue(format!("extra header {} value: {}", key, e)))?;
    }
    Ok(())
}

impl GatewayConfig {
    pub fn new(provider: ModelProvider) -> Self {
        Self {
            provider,
            models: ModelDefaults::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig::default(),
            image: ImageConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn with_models(mut self, models: ModelDefaults) -> Self {
        self.models = models;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_image_format(mut self, output_format: ImageOutputFormat) -> Self {
        self.image.output_format = output_format;
        self
    }

    pub fn with_image_dir(mut self, output_dir: PathBuf) -> Self {
        self.image.output_dir = output_dir;
        self
    }

    pub fn from_yaml(path: &str) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFileError(format!("{}: {}", path, e)))?;
        Self::from_yaml_str(&source)
    }

    /// Parse a YAML document. Every section is optional.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(source)
            .map_err(|e| ConfigError::LoadFileError(e.to_string()))?;

        let mut config = Self::new(ModelProvider::default());
        let Some(doc) = docs.first() else {
            return Ok(config);
        };

        let provider = &doc["provider"];
        if let Some(name) = get_str_value_or_none_from_yaml(provider, "name") {
            config.provider.name = name;
        }
        config.provider.api_key = get_str_value_or_none_from_yaml(provider, "api_key");
        if let Some(base_url) = get_str_value_or_none_from_yaml(provider, "base_url") {
            config.provider.base_url = base_url;
        }
        if let Some(headers_hash) = provider["extra_headers"].as_hash() {
            for (key, value) in headers_hash.iter() {
                match (key.as_str(), value.as_str()) {
                    (Some(key), Some(value)) => {
                        config.provider.extra_headers.insert(key.to_string(), value.to_string());
                    }
                    _ => {
                        return Err(ConfigError::InvalidValue(
                            "extra_headers must map strings to strings".to_string(),
                        ));
                    }
                }
            }
        }

        let models = &doc["models"];
        if let Some(text) = get_str_value_or_none_from_yaml(models, "text") {
            config.models.text = text;
        }
        if let Some(reasoning) = get_str_value_or_none_from_yaml(models, "reasoning") {
            config.models.reasoning = reasoning;
        }
        if let Some(image) = get_str_value_or_none_from_yaml(models, "image") {
            config.models.image = image;
        }

        if let Some(timeout_secs) = get_u64_value_or_none_from_yaml(&doc["request"], "timeout_secs")? {
            config.timeout = Duration::from_secs(timeout_secs);
        }

        let retry = &doc["retry"];
        if let Some(max_attempts) = get_u64_value_or_none_from_yaml(retry, "max_attempts")? {
            config.retry.max_attempts = u32::try_from(max_attempts).map_err(|_| {
                ConfigError::InvalidValue(format!("max_attempts out of range: {}", max_attempts))
            })?;
        }
        if let Some(initial) = get_u64_value_or_none_from_yaml(retry, "initial_interval_ms")? {
            config.retry.initial_interval = Duration::from_millis(initial);
        }
        if let Some(max_interval) = get_u64_value_or_none_from_yaml(retry, "max_interval_ms")? {
            config.retry.max_interval = Duration::from_millis(max_interval);
        }
        if let Some(multiplier) = get_f64_value_or_none_from_yaml(retry, "multiplier") {
            config.retry.multiplier = multiplier;
        }

        let image = &doc["image"];
        if let Some(format) = get_str_value_or_none_from_yaml(image, "output_format") {
            config.image.output_format =
                format.parse::<ImageOutputFormat>().map_err(ConfigError::InvalidValue)?;
        }
        if let Some(dir) = get_str_value_or_none_from_yaml(image, "output_dir") {
            config.image.output_dir = PathBuf::from(dir);
        }

        let server = &doc["server"];
        if let Some(host) = get_str_value_or_none_from_yaml(server, "host") {
            config.server.host = host;
        }
        if let Some(port) = get_u64_value_or_none_from_yaml(server, "port")? {
            config.server.port = u16::try_from(port)
                .map_err(|_| ConfigError::InvalidValue(format!("port out of range: {}", port)))?;
        }
        if let Some(prompt) = get_str_value_or_none_from_yaml(server, "default_prompt") {
            config.server.default_prompt = prompt;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`. Empty values are
    /// ignored.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = get("OPENROUTER_API_KEY") {
            self.provider.api_key = Some(api_key);
        }
        if let Some(base_url) = get("OPENROUTER_BASE_URL") {
            self.provider.base_url = base_url;
        }
        if let Some(site_url) = get("OPENROUTER_SITE_URL") {
            self.provider.extra_headers.insert("HTTP-Referer".to_string(), site_url);
        }
        if let Some(site_name) = get("OPENROUTER_SITE_NAME") {
            self.provider.extra_headers.insert("X-Title".to_string(), site_name);
        }
        if let Some(model) = get("MODEL_LLM") {
            self.models.text = model;
        }
        if let Some(model) = get("MODEL_REASONER") {
            self.models.reasoning = model;
        }
        if let Some(model) = get("MODEL_IMAGE") {
            self.models.image = model;
        }
        if let Some(host) = get("GATEWAY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("GATEWAY_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("GATEWAY_PORT: {}", port)))?;
        }
        if let Some(timeout) = get("GATEWAY_TIMEOUT_SECS") {
            let secs: u64 = timeout
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("GATEWAY_TIMEOUT_SECS: {}", timeout)))?;
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = get("GATEWAY_IMAGE_DIR") {
            self.image.output_dir = PathBuf::from(dir);
        }

        self.validate()?;
        Ok(self)
    }

    /// Apply overrides from the process environment
    pub fn apply_process_env(self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.provider.base_url)?;
        validate_extra_headers(&self.provider.extra_headers)?;
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue("timeout must be positive".to_string()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue(format!(
                "retry multiplier must be at least 1.0, got {}",
                self.retry.multiplier
            )));
        }
        Ok(())
    }
}
