/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use pipeline_http::{tokenize, DataDefinition, Params, Proxy, Request, UrlInput};
use pipeline_types::{PipelineError, Response, Value};

use crate::adapter::Adapter;

const DEFAULT_ADAPTER_NAME: &str = "default";

/// Request construction, adapter dispatch, response validation and error
/// mapping (spec §4.C).
///
/// Holds a [`Proxy`] and a mutable adapter registry. The registry is a
/// `RwLock<HashMap<..>>` rather than a plain map because `set_adapter` must
/// be callable at any time, including while other requests are in flight
/// (spec §5's shared-resource policy).
pub struct DataLayer {
    proxy: Proxy,
    adapters: RwLock<HashMap<String, Arc<dyn Adapter>>>,
}

impl DataLayer {
    /// Constructs a `DataLayer`, installing `default_adapter` under the name
    /// `"default"`.
    pub fn new(proxy: Proxy, default_adapter: Arc<dyn Adapter>) -> Self {
        let mut adapters = HashMap::new();
        adapters.insert(DEFAULT_ADAPTER_NAME.to_string(), default_adapter);
        DataLayer {
            proxy,
            adapters: RwLock::new(adapters),
        }
    }

    /// Returns a [`Builder`] for staged construction.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Registers or overwrites the named adapter.
    pub fn set_adapter(&self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        let name = name.into();
        tracing::debug!(adapter = %name, "registering adapter");
        self.adapters
            .write()
            .expect("adapter registry lock poisoned")
            .insert(name, adapter);
    }

    /// Validates `definition`, layers defaults, rewrites it through the
    /// proxy, resolves its URL, and freezes the result.
    ///
    /// `body`, when given, overrides whatever `definition.body` (or its
    /// default) produced — mirroring the source's `createRequest(definition,
    /// params, body)` call shape where `body` is a distinct positional
    /// argument from the definition itself.
    pub fn create_request(
        &self,
        definition: &DataDefinition,
        params: Option<&Params>,
        body: Option<Value>,
    ) -> Result<Request, PipelineError> {
        if definition.path.trim().is_empty() {
            return Err(PipelineError::invalid_definition(
                "DataDefinition.path must be a non-empty string",
            ));
        }

        let mut request = Request::from_definition(definition);
        if let Some(body) = body {
            request.body = Some(body);
        }

        let request = self.proxy.apply(&request);
        let mut request = request;
        let template = self.proxy.url(UrlInput::Request(&request))?;
        let empty_params = Params::new();
        request.url = tokenize(&template, params.unwrap_or(&empty_params));

        Ok(request.freeze())
    }

    /// Looks up the named adapter, dispatches the request, and maps an
    /// error-bearing response to an `Err`.
    pub async fn fetch(&self, request: &Request) -> Result<Response, PipelineError> {
        if request.url.trim().is_empty() {
            return Err(PipelineError::invalid_request("request.url must not be empty"));
        }
        if request.method.trim().is_empty() {
            return Err(PipelineError::invalid_request("request.method must not be empty"));
        }
        if request.adapter.trim().is_empty() {
            return Err(PipelineError::invalid_request("request.adapter must not be empty"));
        }

        let adapter = {
            let adapters = self.adapters.read().expect("adapter registry lock poisoned");
            adapters.get(&request.adapter).cloned()
        };
        let adapter = adapter.ok_or_else(|| PipelineError::adapter_not_found(request.adapter.clone()))?;

        tracing::debug!(adapter = %request.adapter, url = %request.url, method = %request.method, "dispatching request");
        let response = adapter.dispatch(request.clone()).await;

        if response.is_error() {
            tracing::debug!(status = response.status, "adapter returned an error-bearing response");
            return Err(PipelineError::http_error(response));
        }

        Ok(response)
    }
}

/// Staged builder for [`DataLayer`], mirroring the teacher's
/// `Builder::new() -> .field(...) -> .build()` shape.
#[derive(Default)]
pub struct Builder {
    proxy: Option<Proxy>,
    default_adapter: Option<Arc<dyn Adapter>>,
}

impl Builder {
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn default_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.default_adapter = Some(adapter);
        self
    }

    /// Builds the `DataLayer`.
    ///
    /// # Panics
    ///
    /// Panics if no default adapter was provided — an unconfigured
    /// `DataLayer` can never dispatch anything, which is a programmer error
    /// the teacher's own builders (e.g. `LazyCachingCredentialsProvider`)
    /// also surface as a `build()`-time panic rather than a runtime error.
    pub fn build(self) -> DataLayer {
        DataLayer::new(
            self.proxy.unwrap_or_default(),
            self.default_adapter.expect("default adapter is required"),
        )
    }
}
