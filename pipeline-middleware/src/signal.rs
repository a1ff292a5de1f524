/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use pipeline_http::Request;
use pipeline_types::{PipelineError, Response};

use crate::fetch::{BoxFuture, Fetch};

/// Gates dispatch on an external readiness condition (spec §6) — e.g. "wait
/// for the app's auth bootstrap to finish" — covering both manual-reset
/// (stays signaled once `set`) and auto-reset (rearms itself after each
/// `ready` resolves) variants; `reset` is a no-op default for
/// implementations that never need to be rearmed externally.
pub trait Signal: Send + Sync {
    /// Resolves once the signal is in the ready state.
    fn ready(&self) -> BoxFuture<'_, ()>;
    /// Marks the signal ready.
    fn set(&self);
    /// Returns the signal to the not-ready state.
    fn reset(&self) {}
}

struct WithSignal {
    inner: Arc<dyn Fetch>,
    signal: Arc<dyn Signal>,
}

/// Awaits `signal.ready()` before dispatching to `inner`, then calls
/// `signal.set()` once the inner call settles — success or failure — so a
/// manual-reset signal guarding a single in-flight exchange is always
/// released.
pub fn with_signal(inner: Arc<dyn Fetch>, signal: Arc<dyn Signal>) -> Arc<dyn Fetch> {
    Arc::new(WithSignal { inner, signal })
}

impl Fetch for WithSignal {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            self.signal.ready().await;
            let result = self.inner.call(request).await;
            self.signal.set();
            result
        })
    }
}
