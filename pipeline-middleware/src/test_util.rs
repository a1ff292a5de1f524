/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Lightweight in-memory test doubles for the wrapper contracts this crate
//! decorates a fetch with, mirroring the teacher's
//! `smithy-client::test_connection`/`aws-smithy-runtime::client::test_util`
//! convention.

use std::collections::HashMap;
use std::sync::Mutex;

use pipeline_http::Request;
use pipeline_types::{PipelineError, Response, Value};

use crate::cache::Cache;
use crate::fetch::{BoxFuture, Fetch};
use crate::signal::Signal;
use crate::store::Store;

/// A [`Fetch`] that pops canned `Result`s off a queue, one per call, for
/// scripting retry/auth sequences in tests.
pub struct ScriptedFetch {
    results: Mutex<Vec<Result<Response, PipelineError>>>,
}

impl ScriptedFetch {
    pub fn new(results: Vec<Result<Response, PipelineError>>) -> Self {
        ScriptedFetch {
            results: Mutex::new(results),
        }
    }
}

impl Fetch for ScriptedFetch {
    fn call(&self, _request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        let next = {
            let mut results = self.results.lock().expect("scripted fetch lock poisoned");
            if results.is_empty() {
                Err(PipelineError::invalid_request("scripted fetch exhausted"))
            } else {
                results.remove(0)
            }
        };
        Box::pin(async move { next })
    }
}

/// A [`Fetch`] that reflects the request's headers back as response data,
/// so tests can observe what a header-injecting wrapper actually produced.
pub struct EchoFetch;

impl Fetch for EchoFetch {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            let headers = request
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<HashMap<_, _>>();
            let mut response = Response::new(200);
            response.data = Some(Value::Object(headers));
            Ok(response)
        })
    }
}

/// An in-memory [`Cache`] test double. Never rejects, per the cache
/// contract.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Response>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Default::default()
    }

    fn key(request: &Request) -> String {
        request.url.clone()
    }
}

impl Cache for InMemoryCache {
    fn get(&self, request: &Request) -> BoxFuture<'_, Option<Response>> {
        let key = Self::key(request);
        Box::pin(async move {
            self.entries
                .lock()
                .expect("in-memory cache lock poisoned")
                .get(&key)
                .cloned()
        })
    }

    fn set(&self, request: &Request, response: &Response) -> BoxFuture<'_, ()> {
        let key = Self::key(request);
        let response = response.clone();
        Box::pin(async move {
            self.entries
                .lock()
                .expect("in-memory cache lock poisoned")
                .insert(key, response);
        })
    }
}

/// An in-memory [`Store`] test double, used to exercise the `Store`
/// contract that cache back-ends build on (spec §6) without a real
/// persistence layer.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Store for InMemoryStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<Value>> {
        let key = key.to_string();
        Box::pin(async move {
            self.entries
                .lock()
                .expect("in-memory store lock poisoned")
                .get(&key)
                .cloned()
        })
    }

    fn set(&self, key: &str, value: Value) -> BoxFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move {
            self.entries
                .lock()
                .expect("in-memory store lock poisoned")
                .insert(key, value);
            None
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.entries
                .lock()
                .expect("in-memory store lock poisoned")
                .remove(&key);
        })
    }
}

/// A manual-reset [`Signal`] test double: `ready()` blocks until `set()` is
/// called, then stays set until `reset()`.
#[derive(Default)]
pub struct TestManualSignal {
    set: Mutex<bool>,
    notify: tokio::sync::Notify,
}

impl TestManualSignal {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock().expect("signal lock poisoned")
    }
}

impl Signal for TestManualSignal {
    fn ready(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            loop {
                if *self.set.lock().expect("signal lock poisoned") {
                    return;
                }
                self.notify.notified().await;
            }
        })
    }

    fn set(&self) {
        *self.set.lock().expect("signal lock poisoned") = true;
        self.notify.notify_waiters();
    }

    fn reset(&self) {
        *self.set.lock().expect("signal lock poisoned") = false;
    }
}
