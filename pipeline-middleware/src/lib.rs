/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Orthogonal `Fetch`-decorating wrappers ("pipeline wrappers", spec §4.D)
//! that compose around a [`pipeline_client::DataLayer`]: caching, retry,
//! reauthentication, XSRF token injection, request/response transforms,
//! connectivity gating, diagnostics reporting, default headers, and
//! readiness-signal gating. Each wrapper takes an `Arc<dyn Fetch>` and
//! returns a new `Arc<dyn Fetch>`, so callers build a pipeline by nesting
//! `with_*` calls in whatever order the application needs.

mod auth;
mod cache;
mod connectivity;
mod diagnostics;
mod fetch;
mod headers;
mod retry;
mod signal;
mod store;
mod transform;
mod xsrf;

pub mod test_util;

pub use auth::{with_authentication, Reauthenticate};
pub use cache::{with_cache, Cache};
pub use connectivity::{with_connectivity, AlwaysOnline, ConnectivityMonitor, Reconnect};
pub use diagnostics::{with_diagnostics, Diagnostics};
pub use fetch::{BoxFuture, DataLayerFetch, Fetch};
pub use headers::with_headers;
pub use retry::{with_retry, Falloff, FalloffConfig, RetryFunction};
pub use signal::{with_signal, Signal};
pub use store::Store;
pub use transform::{with_transform, Transformer};
pub use xsrf::{with_xsrf, AppLocation, CookieProvider, XsrfConfig};
