/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;
use std::pin::Pin;

use pipeline_http::Request;
use pipeline_types::Response;

/// A boxed, `Send` future, the systems-language rendition of the
/// `Promise<T>` return type every external interface in spec §6 uses.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Performs the actual transport for a [`Request`].
///
/// Contract: must never reject/panic on a transport failure. On failure,
/// resolve with a [`Response`] whose `meta.error` is true and whose
/// `status` reflects the failure class (`0` for abort/timeout, with
/// `meta.timeout = true` for the latter).
pub trait Adapter: Send + Sync {
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Response>;
}

// A blanket impl lets a plain async closure satisfy `Adapter`, mirroring the
// teacher's `ProvideCredentials` -> blanket `AsyncProvideCredentials` impl.
impl<F, Fut> Adapter for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin((self)(request))
    }
}
