/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! `DataLayer`: turns a `DataDefinition` into a `Request`, dispatches it to
//! a named `Adapter`, validates the `Response`, and raises structured
//! errors (spec §4.C).

mod adapter;
mod data_layer;

pub mod test_util;

pub use adapter::{Adapter, BoxFuture};
pub use data_layer::{Builder, DataLayer};
