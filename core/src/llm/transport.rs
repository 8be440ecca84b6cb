// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;

use crate::llm::error::{LLMError, LLMResult};

/// An outbound POST with a JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

/// Raw reply from upstream. Non-2xx statuses are returned as-is so the
/// adapter can classify them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

/// Sends requests to the upstream provider
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, request: UpstreamRequest) -> LLMResult<UpstreamReply>;
}

/// Transport backed by a pooled reqwest client with a bounded timeout
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> LLMResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LLMError::ConfigError(e.to_string()))?;

        Ok(Self { client })
    }

    fn build_headers(headers: &[(String, String)]) -> LLMResult<HeaderMap> {
        let mut header_map = HeaderMap::new();
        for (key, value) in headers {
            header_map.insert(
                key.parse::<HeaderName>()
                    .map_err(|e| LLMError::ConfigError(format!("Invalid header key: {}", e)))?,
                value
                    .parse::<HeaderValue>()
                    .map_err(|e| LLMError::ConfigError(format!("Invalid header value: {}", e)))?,
            );
        }
        Ok(header_map)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, request: UpstreamRequest) -> LLMResult<UpstreamReply> {
        let headers = Self::build_headers(&request.headers)?;

        debug!("POST {}", request.url);
        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .json(&request.body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Upstream replied {} ({} bytes)", status, body.len());

        Ok(UpstreamReply { status, body })
    }
}
