/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::Arc;

use pipeline_http::Request;
use pipeline_types::{PipelineError, Response};

use crate::fetch::{BoxFuture, Fetch};

struct WithHeaders {
    inner: Arc<dyn Fetch>,
    defaults: HashMap<String, String>,
}

/// Fills in any header names not already present on the request with
/// `defaults`; caller-specified headers win. Applying this twice with the
/// same `defaults` is idempotent, since it only ever fills gaps.
pub fn with_headers(inner: Arc<dyn Fetch>, defaults: HashMap<String, String>) -> Arc<dyn Fetch> {
    Arc::new(WithHeaders { inner, defaults })
}

impl Fetch for WithHeaders {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        let mut clone = request.clone_for_mutation();
        for (name, value) in &self.defaults {
            clone.headers.entry(name.clone()).or_insert_with(|| value.clone());
        }
        self.inner.call(clone)
    }
}
