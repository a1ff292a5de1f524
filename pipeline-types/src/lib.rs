/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Protocol-agnostic value, message, response and error types shared by the
//! rest of the data pipeline core.
//!
//! This crate has no knowledge of HTTP, proxies, or fetch pipelines. It only
//! defines the open/dynamic value representation ([`Value`]) and the
//! structural records ([`Message`], [`Response`], [`Severity`]) that flow
//! between the other crates, plus the error type ([`PipelineError`]) they all
//! raise.

mod error;
mod message;
mod response;
mod value;

pub use error::{status_message, PipelineError, Result};
pub use message::{Message, Severity};
pub use response::{Meta, Response};
pub use value::Value;
