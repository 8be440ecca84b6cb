// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors that can occur when calling the upstream completions API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LLMError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Upstream HTTP error: {status_code} - {body}")]
    UpstreamHttpError {
        status_code: u16,
        body: String,
    },

    #[error("Upstream API error: {message}")]
    UpstreamApiError {
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl LLMError {
    /// Stable label for the error kind, used in gateway responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            LLMError::InvalidInput(_) => "invalid_input",
            LLMError::NetworkError(_) => "network_error",
            LLMError::TimeoutError(_) => "timeout_error",
            LLMError::UpstreamHttpError { .. } => "upstream_http_error",
            LLMError::UpstreamApiError { .. } => "upstream_api_error",
            LLMError::MalformedResponse(_) => "malformed_response",
            LLMError::UnexpectedShape(_) => "unexpected_shape",
            LLMError::ConfigError(_) => "config_error",
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LLMError::TimeoutError(err.to_string())
        } else {
            LLMError::NetworkError(err.to_string())
        }
    }
}

pub type LLMResult<T> = Result<T, LLMError>;
