/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use http::Uri;
use pipeline_http::Request;
use pipeline_types::{PipelineError, Response};
use regex::RegexBuilder;

use crate::fetch::{BoxFuture, Fetch};

/// Reads a named cookie from the host environment (spec §6). A browser host
/// reads `document.cookie`; a non-browser host might read a token store or
/// an in-memory jar (see [`crate::test_util`] for a test double).
pub trait CookieProvider: Send + Sync {
    fn read(&self, cookie_name: &str) -> Option<String>;
}

/// The pipeline's own location, standing in for the browser's
/// `window.location` the source compares requests against. A systems
/// client has no ambient notion of "its own origin", so the embedding
/// application supplies one explicitly.
#[derive(Debug, Clone)]
pub struct AppLocation {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl AppLocation {
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        AppLocation {
            protocol: protocol.into(),
            host: host.into(),
            port,
        }
    }
}

/// Configuration for [`with_xsrf`].
#[derive(Clone)]
pub struct XsrfConfig {
    pub cookie: String,
    pub header: String,
    /// Wildcard host patterns (`*` matches any run of characters) that are
    /// additionally trusted with the token as long as protocol and port
    /// still match `location`.
    pub hosts: Vec<String>,
    pub location: AppLocation,
    pub provider: Arc<dyn CookieProvider>,
}

impl XsrfConfig {
    pub fn new(location: AppLocation, provider: Arc<dyn CookieProvider>) -> Self {
        XsrfConfig {
            cookie: "XSRF-TOKEN".to_string(),
            header: "x-xsrf-token".to_string(),
            hosts: Vec::new(),
            location,
            provider,
        }
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }
}

struct WithXsrf {
    inner: Arc<dyn Fetch>,
    config: XsrfConfig,
}

/// Attaches an XSRF token cookie's value as a request header, but only for
/// requests bound for the app's own origin or one of its whitelisted hosts
/// (spec §6) — never leaked to a third-party target.
pub fn with_xsrf(inner: Arc<dyn Fetch>, config: XsrfConfig) -> Arc<dyn Fetch> {
    Arc::new(WithXsrf { inner, config })
}

fn default_port(protocol: &str) -> u16 {
    if protocol.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}

fn host_pattern_matches(pattern: &str, host: &str) -> bool {
    let mut regex_str = String::from("^");
    let parts: Vec<&str> = pattern.split('*').collect();
    for (index, part) in parts.iter().enumerate() {
        regex_str.push_str(&regex::escape(part));
        if index != parts.len() - 1 {
            regex_str.push_str(".*");
        }
    }
    regex_str.push('$');

    RegexBuilder::new(&regex_str)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(host))
        .unwrap_or(false)
}

impl WithXsrf {
    fn should_attach(&self, request: &Request) -> bool {
        let location = &self.config.location;
        let app_port = if location.port == 0 {
            default_port(&location.protocol)
        } else {
            location.port
        };

        let (target_protocol, target_host, target_port) = match request.url.parse::<Uri>() {
            Ok(uri) => {
                let protocol = uri.scheme_str().unwrap_or(&location.protocol).to_string();
                let authority = uri.authority();
                let host = authority
                    .map(|a| a.host().to_string())
                    .unwrap_or_else(|| location.host.clone());
                let port = authority
                    .and_then(|a| a.port_u16())
                    .unwrap_or_else(|| default_port(&protocol));
                (protocol, host, port)
            }
            Err(_) => (location.protocol.clone(), location.host.clone(), app_port),
        };

        let same_origin = target_protocol.eq_ignore_ascii_case(&location.protocol)
            && target_host.eq_ignore_ascii_case(&location.host)
            && target_port == app_port;

        let whitelisted = target_protocol.eq_ignore_ascii_case(&location.protocol)
            && target_port == app_port
            && self
                .config
                .hosts
                .iter()
                .any(|pattern| host_pattern_matches(pattern, &target_host));

        same_origin || whitelisted
    }
}

impl Fetch for WithXsrf {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            if let Some(token) = self.config.provider.read(&self.config.cookie) {
                if self.should_attach(&request) {
                    let mut clone = request.clone_for_mutation();
                    clone.headers.insert(self.config.header.clone(), token);
                    return self.inner.call(clone).await;
                }
            }
            self.inner.call(request).await
        })
    }
}
