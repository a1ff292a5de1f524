/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use pipeline_http::Request;
use pipeline_types::{PipelineError, Response};

use crate::fetch::{BoxFuture, Fetch};

/// Out-of-band reporting for transport-level failures (spec §6). `status`
/// on [`Response`] is unsigned, so the source's "`status <= 0`" trigger
/// collapses to exactly `status == 0` — the adapter's contract value for an
/// aborted or timed-out exchange (spec §4.C).
pub trait Diagnostics: Send + Sync {
    fn report(&self, request: &Request) -> BoxFuture<'_, ()>;
}

struct WithDiagnostics {
    inner: Arc<dyn Fetch>,
    diagnostics: Arc<dyn Diagnostics>,
}

/// On a thrown error whose response carries `status == 0`, schedules
/// `diagnostics.report` as a detached task — its own failures are the
/// reporter's problem, never the caller's — then rethrows the original
/// error unchanged.
pub fn with_diagnostics(inner: Arc<dyn Fetch>, diagnostics: Arc<dyn Diagnostics>) -> Arc<dyn Fetch> {
    Arc::new(WithDiagnostics { inner, diagnostics })
}

impl Fetch for WithDiagnostics {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            match self.inner.call(request.clone()).await {
                Err(error) => {
                    let should_report = error.response().map(|response| response.status == 0).unwrap_or(false);
                    if should_report {
                        let diagnostics = self.diagnostics.clone();
                        tokio::spawn(async move {
                            diagnostics.report(&request).await;
                        });
                    }
                    Err(error)
                }
                ok => ok,
            }
        })
    }
}
