/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::{Message, Value};

/// Per-response metadata. Distinct from the HTTP status so that adapters and
/// wrappers can flag error/timeout/cache conditions independently of the
/// numeric status code (e.g. a cached 200 still needs `cached = true`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Meta {
    pub error: bool,
    pub cached: bool,
    pub timeout: bool,
    pub messages: Vec<Message>,
    pub retry_count: Option<u32>,
}

/// Structured result of an [`Adapter`](../pipeline_client/trait.Adapter.html)
/// dispatch.
///
/// A response is *error-bearing* iff `meta.error` is true or `status` falls
/// outside `[200, 299]` — see [`Response::is_error`].
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub data: Option<Value>,
    pub status: u16,
    pub status_text: String,
    pub meta: Meta,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            data: None,
            status,
            status_text: String::new(),
            meta: Meta::default(),
        }
    }

    /// A response is error-bearing iff `meta.error` is true OR `status` is
    /// outside `[200, 299]`.
    pub fn is_error(&self) -> bool {
        self.meta.error || !(200..=299).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_in_2xx_without_error_flag_is_not_error_bearing() {
        let r = Response::new(204);
        assert!(!r.is_error());
    }

    #[test]
    fn out_of_range_status_is_error_bearing_even_without_flag() {
        let r = Response::new(404);
        assert!(r.is_error());
    }

    #[test]
    fn error_flag_alone_makes_a_2xx_response_error_bearing() {
        let mut r = Response::new(200);
        r.meta.error = true;
        assert!(r.is_error());
    }
}
