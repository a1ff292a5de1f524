/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pipeline_http::{Request, RequestId};
use pipeline_types::{PipelineError, Response};
use tokio::sync::Mutex as AsyncMutex;

use crate::fetch::{BoxFuture, Fetch};

/// `(request, response) -> Promise` that resolves to retry, rejects to give
/// up (spec §4.D, §6). The source's reject reason carries no payload any
/// caller consumes — only whether it resolved or rejected matters — so this
/// collapses to a `bool` future rather than `Result<(), E>`: `true` means
/// retry, `false` means give up.
pub trait RetryFunction: Send + Sync {
    fn decide(&self, request: &Request, response: Option<&Response>) -> BoxFuture<'_, bool>;

    /// Called by [`with_retry`] when a request settles (success or final
    /// failure) so a stateful retry function can drop its own per-request
    /// bookkeeping, matching spec §3's invariant that `meta.retryCount`
    /// state is cleared on resolution or final rejection. No-op by default.
    fn forget(&self, _request_id: RequestId) {}
}

/// Per-request retry counter, keyed by [`RequestId`] rather than the
/// object-identity map the source uses (spec §9 Design Notes, "Per-request
/// state keyed by identity").
struct WithRetry {
    inner: Arc<dyn Fetch>,
    retry_fn: Arc<dyn RetryFunction>,
    counts: AsyncMutex<HashMap<RequestId, u32>>,
}

/// Wraps `inner` with retry: on success, stamps `response.meta.retry_count`
/// with the accumulated attempt count; on failure, consults `retry_fn` and
/// either re-invokes `inner` with the same request or rethrows the original
/// error with the final count recorded.
pub fn with_retry(inner: Arc<dyn Fetch>, retry_fn: Arc<dyn RetryFunction>) -> Arc<dyn Fetch> {
    Arc::new(WithRetry {
        inner,
        retry_fn,
        counts: AsyncMutex::new(HashMap::new()),
    })
}

impl Fetch for WithRetry {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        self.attempt(request)
    }
}

impl WithRetry {
    fn attempt(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            match self.inner.call(request.clone()).await {
                Ok(mut response) => {
                    let count = {
                        let mut counts = self.counts.lock().await;
                        counts.remove(&request.id).unwrap_or(0)
                    };
                    self.retry_fn.forget(request.id);
                    response.meta.retry_count = Some(count);
                    Ok(response)
                }
                Err(error) => {
                    let count = {
                        let mut counts = self.counts.lock().await;
                        let entry = counts.entry(request.id).or_insert(0);
                        *entry += 1;
                        *entry
                    };
                    let response_for_decision = error.response().cloned();
                    let should_retry = self
                        .retry_fn
                        .decide(&request, response_for_decision.as_ref())
                        .await;

                    if should_retry {
                        tracing::debug!(attempt = count, "retry function granted a retry");
                        self.attempt(request).await
                    } else {
                        tracing::warn!(attempts = count, "retry function gave up; rethrowing");
                        {
                            let mut counts = self.counts.lock().await;
                            counts.remove(&request.id);
                        }
                        self.retry_fn.forget(request.id);
                        let mut error = error;
                        if let PipelineError::HTTPError { response, .. } = &mut error {
                            response.meta.retry_count = Some(count);
                        }
                        Err(error)
                    }
                }
            }
        })
    }
}

/// Configuration for [`Falloff`], spec §4.D's `falloff(times, base,
/// {scheduler, retries})` retry function factory.
#[derive(Debug, Clone, Copy)]
pub struct FalloffConfig {
    pub times: u32,
    pub base: Duration,
}

impl Default for FalloffConfig {
    fn default() -> Self {
        FalloffConfig {
            times: 3,
            base: Duration::from_millis(200),
        }
    }
}

/// Exponential back-off retry function: grants the first `times`
/// invocations per request identity, sleeping `2^n * base` before each
/// retry (`n` = the 0-indexed attempt number), then gives up.
pub struct Falloff {
    config: FalloffConfig,
    attempts: AsyncMutex<HashMap<RequestId, u32>>,
}

impl Falloff {
    pub fn new(config: FalloffConfig) -> Self {
        Falloff {
            config,
            attempts: AsyncMutex::new(HashMap::new()),
        }
    }
}

impl Default for Falloff {
    fn default() -> Self {
        Falloff::new(FalloffConfig::default())
    }
}

impl RetryFunction for Falloff {
    fn decide(&self, request: &Request, _response: Option<&Response>) -> BoxFuture<'_, bool> {
        let request_id = request.id;
        Box::pin(async move {
            let n = {
                let mut attempts = self.attempts.lock().await;
                let entry = attempts.entry(request_id).or_insert(0);
                let n = *entry;
                *entry += 1;
                n
            };

            if n >= self.config.times {
                let mut attempts = self.attempts.lock().await;
                attempts.remove(&request_id);
                return false;
            }

            let delay = self.config.base * (1u32 << n);
            tracing::debug!(attempt = n, delay_ms = delay.as_millis() as u64, "falloff scheduling retry");
            tokio::time::sleep(delay).await;
            true
        })
    }

    fn forget(&self, request_id: RequestId) {
        if let Ok(mut attempts) = self.attempts.try_lock() {
            attempts.remove(&request_id);
        }
    }
}
