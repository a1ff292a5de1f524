/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;
use std::sync::Arc;

use pipeline_http::Request;
use pipeline_types::{PipelineError, Response};

use crate::fetch::{BoxFuture, Fetch};

/// Reports the host environment's network reachability (spec §6). Hosts
/// that have no notion of connectivity should report online unconditionally
/// — see [`AlwaysOnline`].
pub trait ConnectivityMonitor: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Default monitor for hosts without a connectivity signal of their own;
/// `with_connectivity` never waits when paired with this.
pub struct AlwaysOnline;

impl ConnectivityMonitor for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Invoked while offline; resolves once the caller should retry dispatch
/// (e.g. after a reconnect event fires).
pub trait Reconnect: Send + Sync {
    fn reconnect(&self, request: &Request) -> BoxFuture<'_, ()>;
}

impl<F, Fut> Reconnect for F
where
    F: Fn(&Request) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn reconnect(&self, request: &Request) -> BoxFuture<'_, ()> {
        Box::pin((self)(request))
    }
}

struct WithConnectivity {
    inner: Arc<dyn Fetch>,
    monitor: Arc<dyn ConnectivityMonitor>,
    reconnect: Arc<dyn Reconnect>,
}

/// Consults `monitor` before each dispatch; while offline, awaits
/// `reconnect` before handing the request to `inner`.
pub fn with_connectivity(
    inner: Arc<dyn Fetch>,
    monitor: Arc<dyn ConnectivityMonitor>,
    reconnect: Arc<dyn Reconnect>,
) -> Arc<dyn Fetch> {
    Arc::new(WithConnectivity {
        inner,
        monitor,
        reconnect,
    })
}

impl Fetch for WithConnectivity {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            if !self.monitor.is_online() {
                tracing::debug!(url = %request.url, "offline; awaiting reconnect");
                self.reconnect.reconnect(&request).await;
            }
            self.inner.call(request).await
        })
    }
}
