/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use pipeline_types::Value;

/// Per-request identity handle.
///
/// The source language keys retry counters and XSRF memoization tables by
/// object reference. Rust has no implicit reference-identity map, so each
/// [`Request`] carries a `RequestId` allocated once at construction time
/// (see [`RequestId::next`]) and threaded through every wrapper that needs
/// per-call state. Wrappers that clone a request for mutation must allocate
/// a fresh id; wrappers that pass a request through unchanged must preserve
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocates a new, process-unique id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        RequestId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Caller-authored, declarative description of a data operation.
///
/// Only `base` and `path` are required; everything else has a default that
/// [`crate::proxy::Proxy`]/[`crate::data_layer`]-equivalent construction
/// layers beneath the caller's explicit fields (see spec §4.C step 2).
/// Read-only to the library: the core never mutates a `DataDefinition`, only
/// the [`Request`] built from it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataDefinition {
    pub base: String,
    pub path: String,
    pub method: Option<String>,
    pub adapter: Option<String>,
    pub with_credentials: Option<bool>,
    pub compression: Option<bool>,
    pub timeout: Option<u64>,
    pub headers: HashMap<String, String>,
    pub ignore: HashMap<String, Value>,
    pub body: Option<Value>,
    pub response_type: Option<String>,
    /// Arbitrary extension fields, e.g. `version` or other proxy-rule
    /// targets that aren't part of the closed core field set.
    pub extra: HashMap<String, Value>,
}

impl DataDefinition {
    pub fn new(base: impl Into<String>, path: impl Into<String>) -> Self {
        DataDefinition {
            base: base.into(),
            path: path.into(),
            ..Default::default()
        }
    }
}

/// A `DataDefinition` that has passed through the proxy and tokenizer, with
/// `url` and `body` resolved.
///
/// Must be treated as immutable after construction (see
/// [`Request::freeze`]): any wrapper that needs to mutate a `Request` clones
/// it deeply first via [`Request::clone_for_mutation`], which also allocates
/// a new [`RequestId`] since the clone is a new logical call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub base: String,
    pub path: String,
    pub method: String,
    pub adapter: String,
    pub with_credentials: bool,
    pub compression: bool,
    pub timeout: u64,
    pub headers: HashMap<String, String>,
    pub ignore: HashMap<String, Value>,
    pub body: Option<Value>,
    pub response_type: String,
    pub url: String,
    pub extra: HashMap<String, Value>,
    frozen: bool,
}

impl Request {
    /// Seeds the defaults spec §4.C step 2 requires, layering the
    /// definition's explicit fields on top. `url` is left empty; the
    /// caller (the DataLayer) fills it in after running the proxy and
    /// tokenizer.
    pub fn from_definition(definition: &DataDefinition) -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            "accept".to_string(),
            "application/json, text/plain, */*".to_string(),
        );
        headers.extend(definition.headers.clone());

        Request {
            id: RequestId::next(),
            base: definition.base.clone(),
            path: definition.path.clone(),
            method: definition.method.clone().unwrap_or_else(|| "GET".to_string()),
            adapter: definition.adapter.clone().unwrap_or_else(|| "default".to_string()),
            with_credentials: definition.with_credentials.unwrap_or(false),
            compression: definition.compression.unwrap_or(false),
            timeout: definition.timeout.unwrap_or(0),
            headers,
            ignore: definition.ignore.clone(),
            body: definition.body.clone(),
            response_type: definition.response_type.clone().unwrap_or_default(),
            url: String::new(),
            extra: definition.extra.clone(),
            frozen: false,
        }
    }

    /// Marks this request as constructed; only a debug-assertion boundary
    /// since Rust has no runtime object-freeze primitive, but documents the
    /// point after which wrappers must not mutate in place.
    pub fn freeze(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Deep-clones this request for a wrapper that needs to mutate it
    /// (`with_headers`, `with_transform`, `with_xsrf`), allocating a fresh
    /// [`RequestId`] since the clone represents a new logical identity for
    /// any state keyed by the old id.
    pub fn clone_for_mutation(&self) -> Self {
        let mut clone = self.clone();
        clone.id = RequestId::next();
        clone.frozen = false;
        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_layered_under_explicit_fields() {
        let def = DataDefinition::new("base", "path");
        let req = Request::from_definition(&def);
        assert_eq!(req.method, "GET");
        assert_eq!(req.adapter, "default");
        assert_eq!(req.with_credentials, false);
        assert_eq!(req.timeout, 0);
        assert_eq!(
            req.headers.get("accept").map(String::as_str),
            Some("application/json, text/plain, */*")
        );
    }

    #[test]
    fn explicit_fields_win_over_defaults() {
        let mut def = DataDefinition::new("base", "path");
        def.method = Some("POST".to_string());
        def.headers.insert("accept".to_string(), "application/xml".to_string());
        let req = Request::from_definition(&def);
        assert_eq!(req.method, "POST");
        assert_eq!(req.headers.get("accept").map(String::as_str), Some("application/xml"));
    }

    #[test]
    fn cloning_for_mutation_allocates_a_fresh_identity() {
        let def = DataDefinition::new("base", "path");
        let req = Request::from_definition(&def).freeze();
        let clone = req.clone_for_mutation();
        assert_ne!(req.id, clone.id);
        assert!(!clone.is_frozen());
    }

    #[test]
    fn request_ids_are_unique() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert_ne!(a, b);
    }
}
