/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Cross-crate integration tests: a real `DataLayer` wrapped by several
//! `with_*` stages composed together, exercising the full pipeline state
//! machine spec §4.D describes — signal gating, header/transform
//! injection, cache lookup, connectivity wait, and the auth/retry loop
//! around diagnostics around the adapter — plus the concrete end-to-end
//! scenarios spec §8 calls out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use pipeline_client::test_util::{ScriptedAdapter, StaticAdapter};
use pipeline_client::{Adapter, DataLayer};
use pipeline_http::{DataDefinition, Params, ProxyRule, Request};
use pipeline_middleware::test_util::{InMemoryCache, TestManualSignal};
use pipeline_middleware::{
    with_authentication, with_cache, with_headers, with_retry, with_signal, AlwaysOnline,
    ConnectivityMonitor, DataLayerFetch, Falloff, FalloffConfig, Fetch, Reauthenticate,
};
use pipeline_types::{Meta, Message, PipelineError, Response, Severity, Value};

fn definition() -> DataDefinition {
    DataDefinition::new("base", "resource")
}

/// Routes the `tracing` output each test emits (proxy rule application,
/// adapter dispatch, retry/auth decisions) through `tracing-subscriber`'s
/// test writer so `cargo test -- --nocapture` shows it grouped with the
/// failing test, matching the source spec's call for leveled diagnostics
/// at every decision point these wrappers make. Guarded by `Once` since
/// `tokio::test` runs each test in its own task but `tracing`'s global
/// subscriber can only be installed once per process.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

#[tokio::test]
async fn full_stack_success_flows_through_every_stage() {
    init_tracing();
    let layer = Arc::new(
        DataLayer::builder()
            .proxy(Default::default())
            .default_adapter(Arc::new(StaticAdapter::new(Response::new(200))))
            .build(),
    );
    let base: Arc<dyn Fetch> = Arc::new(DataLayerFetch::new(layer.clone()));

    let mut defaults = HashMap::new();
    defaults.insert("x-client".to_string(), "pipeline-core".to_string());
    let headered = with_headers(base, defaults);

    let cache = Arc::new(InMemoryCache::new());
    let cached = with_cache(headered, cache);

    let signal = Arc::new(TestManualSignal::new());
    signal.set();
    let gated = with_signal(cached, signal);

    let def = definition();
    let request = layer.create_request(&def, None, None).unwrap();
    let response = gated.call(request).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(!response.meta.cached);
}

#[tokio::test]
async fn cache_hit_short_circuits_the_adapter() {
    init_tracing();
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let adapter: Arc<dyn Adapter> = Arc::new(move |_req: Request| {
        let calls = calls_clone.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Response::new(200)
        }
    });

    let layer = Arc::new(
        DataLayer::builder()
            .proxy(Default::default())
            .default_adapter(adapter)
            .build(),
    );
    let base: Arc<dyn Fetch> = Arc::new(DataLayerFetch::new(layer.clone()));
    let cache = Arc::new(InMemoryCache::new());
    let wrapped = with_cache(base, cache);

    let def = definition();
    let first = layer.create_request(&def, None, None).unwrap();
    let second = layer.create_request(&def, None, None).unwrap();

    let r1 = wrapped.call(first).await.unwrap();
    assert!(!r1.meta.cached);
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let r2 = wrapped.call(second).await.unwrap();
    assert!(r2.meta.cached);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_and_auth_compose_around_a_flaky_adapter() {
    init_tracing();
    // First call: 401 (caught by with_authentication, one reauth + retry).
    // Retried call: 503 (caught by with_retry/falloff, backs off and retries).
    // Final call: success.
    let adapter = Arc::new(ScriptedAdapter::new(vec![
        Response {
            data: None,
            status: 401,
            status_text: String::new(),
            meta: Meta {
                error: true,
                ..Default::default()
            },
        },
        Response {
            data: None,
            status: 503,
            status_text: String::new(),
            meta: Meta {
                error: true,
                ..Default::default()
            },
        },
        Response::new(200),
    ]));

    let layer = Arc::new(
        DataLayer::builder()
            .proxy(Default::default())
            .default_adapter(adapter)
            .build(),
    );
    let base: Arc<dyn Fetch> = Arc::new(DataLayerFetch::new(layer.clone()));

    struct NoopReauth;
    impl Reauthenticate for NoopReauth {
        fn reauthenticate(
            &self,
            _request: &Request,
        ) -> pipeline_client::BoxFuture<'_, Result<(), PipelineError>> {
            Box::pin(async { Ok(()) })
        }
    }

    // `with_authentication` sits closest to the adapter so a 401 gets one
    // reauth+retry before anything bubbles up to the outer retry loop; a
    // subsequent 503 is `with_retry`'s problem, not `with_authentication`'s.
    let authenticated = with_authentication(base, Arc::new(NoopReauth));
    let retried = with_retry(
        authenticated,
        Arc::new(Falloff::new(FalloffConfig {
            times: 2,
            base: std::time::Duration::from_millis(5),
        })),
    );

    let def = definition();
    let request = layer.create_request(&def, None, None).unwrap();
    let response = retried.call(request).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn data_layer_fetch_rejects_with_mapped_status_message() {
    init_tracing();
    let layer = Arc::new(
        DataLayer::builder()
            .proxy(Default::default())
            .default_adapter(Arc::new(StaticAdapter::new(Response {
                data: None,
                status: 402,
                status_text: String::new(),
                meta: Meta {
                    error: true,
                    ..Default::default()
                },
            })))
            .build(),
    );
    let def = definition();
    let request = layer.create_request(&def, None, None).unwrap();
    let err = layer.fetch(&request).await.unwrap_err();
    match err {
        PipelineError::HTTPError { message, response } => {
            assert_eq!(message, "Payment Required");
            assert_eq!(response.status, 402);
        }
        other => panic!("expected HTTPError, got {other:?}"),
    }
}

#[tokio::test]
async fn proxy_rewritten_url_and_tokenized_params_reach_the_adapter() {
    init_tracing();
    let mut proxy = pipeline_http::Proxy::new();
    proxy.use_rules([ProxyRule::new()
        .matching("base", "base")
        .set("path", ":token/path")]);

    let seen_url = Arc::new(std::sync::Mutex::new(String::new()));
    let seen_url_clone = seen_url.clone();
    let adapter: Arc<dyn Adapter> = Arc::new(move |req: Request| {
        let seen_url = seen_url_clone.clone();
        async move {
            *seen_url.lock().unwrap() = req.url.clone();
            Response::new(200)
        }
    });

    let layer = Arc::new(
        DataLayer::builder()
            .proxy(proxy)
            .default_adapter(adapter)
            .build(),
    );

    let mut params = Params::new();
    params.insert("token".into(), Value::String("abc".into()));
    params.insert(
        "arr".into(),
        Value::Array(vec![Value::Number(123.0), Value::Number(456.0)]),
    );

    let def = definition();
    let request = layer.create_request(&def, Some(&params), None).unwrap();
    assert_eq!(request.url, "/abc/path?arr=123&arr=456");

    let _ = layer.fetch(&request).await.unwrap();
    assert_eq!(*seen_url.lock().unwrap(), "/abc/path?arr=123&arr=456");
}

#[tokio::test]
async fn connectivity_gate_waits_before_dispatch_in_a_full_pipeline() {
    init_tracing();
    let layer = Arc::new(
        DataLayer::builder()
            .proxy(Default::default())
            .default_adapter(Arc::new(StaticAdapter::new(Response::new(200))))
            .build(),
    );
    let base: Arc<dyn Fetch> = Arc::new(DataLayerFetch::new(layer.clone()));
    let gated = pipeline_middleware::with_connectivity(
        base,
        Arc::new(AlwaysOnline),
        Arc::new(|_req: &Request| async {}),
    );

    let def = definition();
    let request = layer.create_request(&def, None, None).unwrap();
    let response = gated.call(request).await.unwrap();
    assert_eq!(response.status, 200);
}

#[allow(dead_code)]
fn assert_monitor_is_object_safe(_: &dyn ConnectivityMonitor) {}

#[allow(dead_code)]
fn unused_message_constructor() -> Message {
    Message::new("diagnostic", Severity::None)
}
