/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::Value;

/// Classifies how recoverable an error or message is.
///
/// Attached to both [`crate::PipelineError`] and [`Message`] so that
/// downstream handlers can decide retry, display, or logging behavior
/// without inspecting the concrete error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Informational; not an error.
    None,
    /// Recoverable; the caller may retry or otherwise handle it.
    Error,
    /// Unrecoverable programmer error (bad configuration, missing
    /// required field). Surfaces synchronously wherever possible.
    Fatal,
}

/// A single structured diagnostic attached to a [`crate::Response`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub code: String,
    pub severity: Severity,
    pub data: Vec<Value>,
}

impl Message {
    pub fn new(code: impl Into<String>, severity: Severity) -> Self {
        Message {
            code: code.into(),
            severity,
            data: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Vec<Value>) -> Self {
        self.data = data;
        self
    }
}
