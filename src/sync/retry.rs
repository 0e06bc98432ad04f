// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::SyncError;
use crate::remote::RemoteError;

/// How many times a remote call is attempted and how long to wait in between.
///
/// The wait after the n-th failed attempt is `base_delay * n`. Only failures accepted by the
/// retryable predicate consume the budget; anything else ends the call at once.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    retryable: fn(&RemoteError) -> bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay, retryable: RemoteError::is_retryable }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_retryable(mut self, retryable: fn(&RemoteError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    pub fn is_retryable(&self, err: &RemoteError) -> bool {
        (self.retryable)(err)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

/// Runs `call` until it succeeds, fails with a non-retryable error, or the attempt budget is
/// spent, sleeping between attempts.
pub async fn execute_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation, attempt, "remote call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if policy.is_retryable(&err) && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "remote call failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                tracing::warn!(operation, attempt, error = %err, "remote call failed");
                return Err(if policy.is_retryable(&err) {
                    SyncError::Retryable { operation, attempts: attempt, source: err }
                } else {
                    SyncError::Terminal { operation, source: err }
                });
            }
        }
    }
}
