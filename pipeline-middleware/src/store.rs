/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use pipeline_types::Value;

use crate::fetch::BoxFuture;

/// Key-value persistence back-end used by cache decorators (spec §6) —
/// in-memory, web storage, indexed-database, etc. `DataLayer` never calls
/// this directly; it's part of the external-interface contract the pack's
/// `Cache`/`Store` back-ends build on, included here so `with_cache`-style
/// integration tests have something concrete to exercise
/// ([`crate::test_util::InMemoryStore`]).
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<Value>>;
    /// Resolves to an opaque handle (e.g. an expiring back-end's generation
    /// token) or `None` when the back-end has nothing to report.
    fn set(&self, key: &str, value: Value) -> BoxFuture<'_, Option<String>>;
    fn delete(&self, key: &str) -> BoxFuture<'_, ()>;
}
