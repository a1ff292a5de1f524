/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;

/// Protocol-agnostic open/dynamic value.
///
/// `Value` stands in for the implicitly-typed maps and arrays the source
/// language gets for free. It is used for querystring parameters, arbitrary
/// `DataDefinition`/`Request` extension fields injected by proxy rules, and
/// request/response bodies that don't have a fixed shape.
///
/// Modeled after the teacher's open-content `Document` type: an object,
/// array, number, string, bool, or null, with no schema attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A nested map of values (not serialized by the tokenizer; see its
    /// querystring rules).
    Object(HashMap<String, Value>),
    /// An ordered array. The tokenizer expands these into repeated
    /// `key=v1&key=v2` querystring entries.
    Array(Vec<Value>),
    /// A floating point number.
    Number(f64),
    /// A UTF-8 string.
    String(String),
    /// `true`/`false`. The tokenizer renders `false` as `key=false`.
    Bool(bool),
    /// Explicit null. The tokenizer renders this as a bare `key` with no
    /// `=value`, distinct from an absent key.
    Null,
}

impl Value {
    /// Returns the value rendered the way the tokenizer's querystring
    /// encoder expects a scalar to look, or `None` for values that expand
    /// to multiple entries or aren't serializable as a single scalar
    /// (`Array`, `Object`).
    pub fn as_scalar_str(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(values: HashMap<String, Value>) -> Self {
        Value::Object(values)
    }
}
