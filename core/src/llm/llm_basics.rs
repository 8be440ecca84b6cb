// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Operation category of a call. Selects the default model, the extraction
/// path and whether retry applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Plain text chat
    Text,
    /// Chat against a reasoning model
    Reasoning,
    /// Image generation
    Image,
}

impl OperationKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Text => "text",
            OperationKind::Reasoning => "reasoning",
            OperationKind::Image => "image",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, OperationKind::Image)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The adapter's unified output, whatever shape the provider used
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NormalizedResult {
    Text(String),
    /// A direct URL or a `data:` URI carrying base64-encoded bytes
    ImageRef(String),
}

impl NormalizedResult {
    pub fn into_inner(self) -> String {
        match self {
            NormalizedResult::Text(value) | NormalizedResult::ImageRef(value) => value,
        }
    }
}

/// How image models are asked to return their output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageOutputFormat {
    /// `"modalities": ["image", "text"]`, for chat models that emit images
    #[default]
    Modalities,
    /// `"response_format": "b64_json"` with a fixed size. Request flag only:
    /// the reply must still carry a URL or `data:` URI in one of the
    /// locations the extractor reads. A bare `data[0].b64_json` is not
    /// recognized.
    B64Json,
}

impl FromStr for ImageOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "modalities" => Ok(ImageOutputFormat::Modalities),
            "b64_json" => Ok(ImageOutputFormat::B64Json),
            _ => Err(format!("Invalid image output format: {}", s)),
        }
    }
}

impl ImageOutputFormat {
    /// Extra request parameters implied by this format
    pub fn extra_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        match self {
            ImageOutputFormat::Modalities => {
                params.insert("modalities".to_string(), serde_json::json!(["image", "text"]));
            }
            ImageOutputFormat::B64Json => {
                params.insert("size".to_string(), Value::String("1024x1024".to_string()));
                params.insert("response_format".to_string(), Value::String("b64_json".to_string()));
            }
        }
        params
    }
}

/// A single chat message in the request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body sent to the completions endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub extra_params: Map<String, Value>,
}

impl RequestPayload {
    /// Build a single-turn payload. Extra params may not shadow `model` or
    /// `messages`.
    pub fn new(prompt: &str, model: &str, extra_params: Option<&Map<String, Value>>) -> Self {
        let extra_params = extra_params
            .map(|params| {
                params
                    .iter()
                    .filter(|(key, _)| key.as_str() != "model" && key.as_str() != "messages")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
            extra_params,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
