// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod error;
pub mod extract;
pub mod llm_basics;
pub mod openrouter_client;
pub mod retry_utils;
pub mod transport;

pub use error::{LLMError, LLMResult};
pub use llm_basics::{ChatMessage, ImageOutputFormat, NormalizedResult, OperationKind, RequestPayload};
pub use openrouter_client::OpenRouterClient;
pub use retry_utils::{RetryConfig, retry_with_backoff};
pub use transport::{ReqwestTransport, Transport, UpstreamReply, UpstreamRequest};
