/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use crate::{Response, Severity};

/// A boxed [`std::error::Error`] trait object that's [`Send`] and [`Sync`],
/// used to carry opaque upstream causes (adapter transport failures that
/// aren't one of the core's named kinds).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Every error kind the pipeline core raises.
///
/// Each variant carries a [`Severity`] (see [`PipelineError::severity`]) and,
/// where applicable, the [`Response`] that triggered it. Configuration errors
/// (`Fatal`) surface synchronously from construction or `create_request`;
/// runtime errors are delivered via the `fetch` future's rejection.
#[derive(Debug)]
pub enum PipelineError {
    /// `create_request` received a `DataDefinition` missing a string `base`
    /// or non-empty `path`.
    InvalidDefinition { message: String },
    /// `fetch` received a request without a non-empty `url`, `method`, or
    /// `adapter`.
    InvalidRequest { message: String },
    /// No adapter is registered under the requested name.
    AdapterNotFound { adapter: String },
    /// A matching proxy rule supplied an origin that failed to parse as a
    /// URL.
    InvalidOrigin { origin: String },
    /// The adapter returned an error-bearing response.
    HTTPError {
        message: String,
        response: Box<Response>,
    },
    /// `with_cache` was constructed with a non-conforming cache.
    InvalidCache { message: String },
    /// `with_retry`/`falloff` was constructed with a non-conforming retry
    /// function.
    InvalidRetry { message: String },
    /// `with_authentication` was constructed with a non-conforming
    /// reauthenticate callback.
    InvalidReauth { message: String },
    /// `with_diagnostics` was constructed with a non-conforming diagnostics
    /// callback.
    InvalidDiagnostics { message: String },
    /// An opaque upstream cause that doesn't map to any of the named kinds
    /// above (e.g. an adapter's own transport error).
    Unhandled(BoxError),
}

impl PipelineError {
    pub fn invalid_definition(message: impl Into<String>) -> Self {
        PipelineError::InvalidDefinition {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        PipelineError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn adapter_not_found(adapter: impl Into<String>) -> Self {
        PipelineError::AdapterNotFound {
            adapter: adapter.into(),
        }
    }

    pub fn invalid_origin(origin: impl Into<String>) -> Self {
        PipelineError::InvalidOrigin {
            origin: origin.into(),
        }
    }

    pub fn http_error(response: Response) -> Self {
        let message = if !response.status_text.is_empty() {
            response.status_text.clone()
        } else {
            status_message(response.status)
                .map(str::to_string)
                .unwrap_or_else(|| "Unknown HTTP Error".to_string())
        };
        PipelineError::HTTPError {
            message,
            response: Box::new(response),
        }
    }

    pub fn unhandled(cause: impl Into<BoxError>) -> Self {
        PipelineError::Unhandled(cause.into())
    }

    /// Severity classification, used by callers to decide whether a failure
    /// is a programmer error (`Fatal`) or a recoverable runtime condition
    /// (`Error`).
    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::InvalidDefinition { .. }
            | PipelineError::InvalidRequest { .. }
            | PipelineError::AdapterNotFound { .. }
            | PipelineError::InvalidCache { .. }
            | PipelineError::InvalidRetry { .. }
            | PipelineError::InvalidReauth { .. }
            | PipelineError::InvalidDiagnostics { .. } => Severity::Fatal,
            PipelineError::InvalidOrigin { .. } => Severity::Error,
            PipelineError::HTTPError { .. } => Severity::Error,
            PipelineError::Unhandled(_) => Severity::Error,
        }
    }

    /// The response that triggered this error, if any (only `HTTPError`
    /// carries one).
    pub fn response(&self) -> Option<&Response> {
        match self {
            PipelineError::HTTPError { response, .. } => Some(response),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidDefinition { message } => {
                write!(f, "invalid data definition: {message}")
            }
            PipelineError::InvalidRequest { message } => write!(f, "invalid request: {message}"),
            PipelineError::AdapterNotFound { adapter } => {
                write!(f, "no adapter registered under name {adapter:?}")
            }
            PipelineError::InvalidOrigin { origin } => {
                write!(f, "proxy rule supplied an unparseable origin: {origin:?}")
            }
            PipelineError::HTTPError { message, response } => {
                write!(f, "HTTP error ({}): {}", response.status, message)
            }
            PipelineError::InvalidCache { message } => write!(f, "invalid cache: {message}"),
            PipelineError::InvalidRetry { message } => write!(f, "invalid retry function: {message}"),
            PipelineError::InvalidReauth { message } => {
                write!(f, "invalid reauthenticate callback: {message}")
            }
            PipelineError::InvalidDiagnostics { message } => {
                write!(f, "invalid diagnostics callback: {message}")
            }
            PipelineError::Unhandled(cause) => write!(f, "unhandled pipeline error: {cause}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Unhandled(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// Maps an HTTP status code to its standard reason phrase.
///
/// Used by [`PipelineError::http_error`] when an adapter leaves
/// `status_text` empty. Covers exactly the ranges/codes enumerated by the
/// core's error handling design: 100, 101, 103, 200–206, 300–308, 400–418,
/// 422, 425, 426, 428, 429, 431, 451, 500–505, 511.
pub fn status_message(status: u16) -> Option<&'static str> {
    Some(match status {
        100 => "Continue",
        101 => "Switching Protocols",
        103 => "Early Hints",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        306 => "Switch Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a Teapot",
        422 => "Unprocessable Entity",
        425 => "Too Early",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        511 => "Network Authentication Required",
        _ => return None,
    })
}
