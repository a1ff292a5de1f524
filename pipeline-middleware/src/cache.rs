/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use pipeline_http::Request;
use pipeline_types::{PipelineError, Response};

use crate::fetch::{BoxFuture, Fetch};

/// Opaque key-value store addressed by [`Request`] (spec §6). Must never
/// reject: failures are the cache's own problem to swallow and treat as a
/// miss/no-op.
pub trait Cache: Send + Sync {
    fn get(&self, request: &Request) -> BoxFuture<'_, Option<Response>>;
    fn set(&self, request: &Request, response: &Response) -> BoxFuture<'_, ()>;
}

struct WithCache {
    inner: Arc<dyn Fetch>,
    cache: Arc<dyn Cache>,
}

/// Before calling `inner`, checks `cache.get(request)`; a hit is cloned,
/// stamped `meta.cached = true`, and returned directly. A miss falls
/// through to `inner`, then populates the cache fire-and-forget (spec
/// §4.D) — the write happens on a detached task so a slow or wedged
/// `cache.set` never delays the response already available to the caller.
pub fn with_cache(inner: Arc<dyn Fetch>, cache: Arc<dyn Cache>) -> Arc<dyn Fetch> {
    Arc::new(WithCache { inner, cache })
}

impl Fetch for WithCache {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            if let Some(mut cached) = self.cache.get(&request).await {
                tracing::debug!(url = %request.url, "cache hit");
                cached.meta.cached = true;
                return Ok(cached);
            }

            let response = self.inner.call(request.clone()).await?;

            let cache = self.cache.clone();
            let cache_request = request.clone();
            let cache_response = response.clone();
            tokio::spawn(async move {
                cache.set(&cache_request, &cache_response).await;
            });

            Ok(response)
        })
    }
}
