/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! URL tokenizer, proxy rule engine, and the `DataDefinition`/`Request`
//! record types that sit between a caller's declarative data definition and
//! a dispatch-ready request.

mod proxy;
mod request;
mod tokenize;

pub use proxy::{Proxy, ProxyRule, UrlInput};
pub use request::{DataDefinition, Request, RequestId};
pub use tokenize::{tokenize, Params};
