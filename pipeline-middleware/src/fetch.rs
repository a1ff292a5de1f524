/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pipeline_client::DataLayer;
use pipeline_http::Request;
use pipeline_types::{PipelineError, Response};

/// A boxed, `Send` future — the same shape `pipeline_client::BoxFuture` uses,
/// repeated here so this crate doesn't need to depend on
/// `pipeline-client`'s internal adapter module layout.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single pipeline stage: `request -> Result<Response, PipelineError>`.
///
/// This is the "pipeline stage" interface spec §9's Design Notes call for —
/// a function type rather than an inheritance tree — generalized from the
/// teacher's `tower::Layer`/`Service` middleware-stacking model
/// (`ServiceBuilder::layer(...)` chaining) without the full generic
/// `Service`/`Poll` machinery, since every request here is the same
/// concrete dynamic type. Each `with_*` wrapper takes an `Arc<dyn Fetch>`
/// (the inner stage) and returns a new `Arc<dyn Fetch>`.
pub trait Fetch: Send + Sync {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>>;
}

impl<F, Fut> Fetch for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, PipelineError>> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin((self)(request))
    }
}

/// Adapts a [`DataLayer`] into the innermost [`Fetch`] stage of a decorated
/// pipeline: `DataLayer::fetch` already has the right `request ->
/// Result<Response, PipelineError>` shape, so this is a thin wrapper rather
/// than new logic.
pub struct DataLayerFetch(Arc<DataLayer>);

impl DataLayerFetch {
    pub fn new(data_layer: Arc<DataLayer>) -> Self {
        DataLayerFetch(data_layer)
    }
}

impl Fetch for DataLayerFetch {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move { self.0.fetch(&request).await })
    }
}
