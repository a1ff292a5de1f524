/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Lightweight in-memory test doubles, mirroring the teacher's
//! `smithy-client::test_connection`/`aws-smithy-runtime::client::test_util`
//! convention of shipping a small fake transport alongside the real one.

use std::sync::Mutex;

use pipeline_http::Request;
use pipeline_types::Response;

use crate::adapter::{Adapter, BoxFuture};

/// An [`Adapter`] that always resolves with the same canned response,
/// regardless of the request it's given.
pub struct StaticAdapter {
    response: Response,
}

impl StaticAdapter {
    pub fn new(response: Response) -> Self {
        StaticAdapter { response }
    }
}

impl Adapter for StaticAdapter {
    fn dispatch(&self, _request: Request) -> BoxFuture<'_, Response> {
        let response = self.response.clone();
        Box::pin(async move { response })
    }
}

/// An [`Adapter`] that pops canned responses off a queue, one per call, so
/// tests can script a sequence of outcomes (e.g. a timeout followed by a
/// success, for exercising retry wrappers).
pub struct ScriptedAdapter {
    responses: Mutex<Vec<Response>>,
}

impl ScriptedAdapter {
    pub fn new(responses: Vec<Response>) -> Self {
        ScriptedAdapter {
            responses: Mutex::new(responses),
        }
    }
}

impl Adapter for ScriptedAdapter {
    fn dispatch(&self, _request: Request) -> BoxFuture<'_, Response> {
        let next = {
            let mut responses = self.responses.lock().expect("scripted adapter lock poisoned");
            if responses.is_empty() {
                Response::new(0)
            } else {
                responses.remove(0)
            }
        };
        Box::pin(async move { next })
    }
}
