// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, warn};
use std::time::Duration;
use crate::llm::error::LLMResult;

/// Retry configuration for upstream calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_interval: Duration::from_millis(1000),
            max_interval: Duration::from_secs(60),
            multiplier: 1.5,
        }
    }
}

impl RetryConfig {
    /// A configuration that performs exactly one attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            randomization_factor: 0.0,
            multiplier: self.multiplier,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Delays slept between consecutive attempts
    pub fn delays(&self) -> Vec<Duration> {
        let mut schedule = self.schedule();
        (1..self.attempts())
            .map(|_| schedule.next_backoff().unwrap_or(self.max_interval))
            .collect()
    }
}

/// Retry an operation with multiplicative backoff, returning the last error
/// once every attempt has failed
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    label: &str,
) -> LLMResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = LLMResult<T>>,
{
    let max_attempts = config.attempts();
    let mut schedule = config.schedule();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("[{}] Succeeded on attempt {}/{}", label, attempt, max_attempts);
                }
                return Ok(result);
            }
            Err(err) => {
                if attempt >= max_attempts {
                    if max_attempts > 1 {
                        warn!("[{}] Giving up after {} attempts: {}", label, attempt, err);
                    }
                    return Err(err);
                }

                let delay = schedule.next_backoff().unwrap_or(config.max_interval);
                warn!(
                    "[{}] Attempt {}/{} failed, retrying in {:?}: {}",
                    label, attempt, max_attempts, delay, err
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
