/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::OnceLock;

use http::Uri;
use pipeline_types::{PipelineError, Value};
use regex::{Regex, RegexBuilder};

use crate::request::{DataDefinition, Request};

/// A single ordered proxy rule.
///
/// `match_` restricts which requests the rule applies to (metadata only,
/// never copied into the request); `fields` is the open map of
/// request-shaped data merged into a matching request, excluding `match`
/// itself. Field names line up with [`Request`]'s core fields
/// (`base`, `path`, `method`, `adapter`, `with_credentials`, `compression`,
/// `timeout`, `headers`, `ignore`, `body`, `response_type`) plus whatever
/// extension fields (`protocol`, `host`, `port`, `origin`, `version`, ...)
/// [`Proxy::url`] and callers choose to read back out of
/// [`Request::extra`].
#[derive(Debug, Clone, Default)]
pub struct ProxyRule {
    pub match_: Option<HashMap<String, String>>,
    pub fields: HashMap<String, Value>,
}

impl ProxyRule {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a match predicate: `field` must match `pattern` (case-insensitive
    /// regex) for this rule to apply.
    pub fn matching(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.match_
            .get_or_insert_with(HashMap::new)
            .insert(field.into(), pattern.into());
        self
    }

    /// Sets a field this rule merges into a matching request.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }
}

struct CompiledRule {
    match_: Option<HashMap<String, Regex>>,
    /// Set when at least one match pattern failed to compile. Such a rule
    /// never applies — silently dropping only the broken predicate would
    /// widen what the rule matches, which is the wrong failure direction
    /// for a routing rewrite engine.
    unmatchable: bool,
    fields: HashMap<String, Value>,
}

fn compile_rule(rule: ProxyRule) -> CompiledRule {
    let mut unmatchable = false;
    let match_ = rule.match_.map(|raw| {
        let mut compiled = HashMap::with_capacity(raw.len());
        for (field, pattern) in raw {
            match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(re) => {
                    compiled.insert(field, re);
                }
                Err(error) => {
                    tracing::warn!(
                        field = %field,
                        pattern = %pattern,
                        %error,
                        "proxy rule match pattern failed to compile; rule disabled"
                    );
                    unmatchable = true;
                }
            }
        }
        compiled
    });
    CompiledRule {
        match_,
        unmatchable,
        fields: rule.fields,
    }
}

/// Selects which form of [`Proxy::url`] to run: plain `(base, path parts)`,
/// or reading `base`/`path`/`protocol`/`host`/`port` straight off a
/// [`Request`].
pub enum UrlInput<'a> {
    Base { base: &'a str, parts: Vec<&'a str> },
    Request(&'a Request),
}

impl<'a> UrlInput<'a> {
    pub fn base(base: &'a str, parts: &[&'a str]) -> Self {
        UrlInput::Base {
            base,
            parts: parts.to_vec(),
        }
    }
}

fn multi_slash() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("/{2,}").unwrap())
}

fn normalize_path(raw: &str) -> String {
    multi_slash()
        .replace_all(raw, "/")
        .trim_start_matches('/')
        .to_string()
}

/// An ordered rule engine that rewrites request routing and composes URLs.
///
/// Rules are append-only and stored in insertion order; [`Proxy::apply`] and
/// [`Proxy::url`] each iterate a snapshot of that order, so readers never
/// observe a torn write even if `use_rules` is called concurrently with a
/// pending fetch.
#[derive(Default)]
pub struct Proxy {
    rules: Vec<CompiledRule>,
}

impl Proxy {
    pub fn new() -> Self {
        Proxy { rules: Vec::new() }
    }

    /// Appends rules; may be called at any time.
    pub fn use_rules(&mut self, rules: impl IntoIterator<Item = ProxyRule>) {
        self.rules.extend(rules.into_iter().map(compile_rule));
    }

    fn rule_matches(rule: &CompiledRule, request: &Request) -> bool {
        match &rule.match_ {
            None => true,
            Some(_) if rule.unmatchable => false,
            Some(predicates) => predicates.iter().all(|(field, re)| {
                field_as_string(request, field)
                    .map(|value| re.is_match(&value))
                    .unwrap_or(false)
            }),
        }
    }

    /// Returns a request updated by every rule whose `match` predicates all
    /// succeed, applied in insertion order. Rules with no `match` always
    /// apply. For requests matching no rule, returns a value structurally
    /// equal to the input (spec §8 invariant).
    pub fn apply(&self, request: &Request) -> Request {
        let mut result = request.clone();
        for rule in &self.rules {
            if Self::rule_matches(rule, &result) {
                tracing::debug!(fields = ?rule.fields.keys().collect::<Vec<_>>(), "applying proxy rule");
                for (key, value) in rule.fields.clone() {
                    apply_field(&mut result, &key, value);
                }
            }
        }
        result
    }

    /// Builds a URL from either `(base, path parts)` or a [`Request`]'s
    /// `base`/`path`/`protocol`/`host`/`port`/`origin`.
    pub fn url(&self, input: UrlInput<'_>) -> Result<String, PipelineError> {
        let (base, raw_path, seed_extra) = match input {
            UrlInput::Base { base, parts } => (base.to_string(), parts.join("/"), HashMap::new()),
            UrlInput::Request(request) => {
                (request.base.clone(), request.path.clone(), request.extra.clone())
            }
        };
        let path = normalize_path(&raw_path);

        let mut synth = Request::from_definition(&DataDefinition::new(base, path.clone()));
        synth.extra = seed_extra;
        let synth = self.apply(&synth);

        let protocol = synth.extra.get("protocol").and_then(Value::as_scalar_str);
        let host = synth.extra.get("host").and_then(Value::as_scalar_str);
        let port = synth.extra.get("port").and_then(Value::as_scalar_str);
        let origin = synth.extra.get("origin").and_then(Value::as_scalar_str);

        let (protocol, host, port) = match origin {
            Some(origin) => {
                let uri: Uri = origin
                    .parse()
                    .map_err(|_| PipelineError::invalid_origin(origin.clone()))?;
                let scheme = uri.scheme_str().unwrap_or("").to_string();
                let authority = uri.authority();
                let host = authority.map(|a| a.host().to_string()).unwrap_or_default();
                let port = authority.and_then(|a| a.port_u16()).map(|p| p.to_string());
                (Some(scheme), Some(host), port)
            }
            None => (protocol, host, port),
        };

        Ok(format_url(
            protocol.as_deref(),
            host.as_deref(),
            port.as_deref(),
            &path,
        ))
    }
}

fn format_url(protocol: Option<&str>, host: Option<&str>, port: Option<&str>, path: &str) -> String {
    let host = host.unwrap_or("");
    let protocol_clean: String = protocol
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();

    let mut out = String::new();
    if protocol_clean.eq_ignore_ascii_case("file") {
        out.push_str("file://");
        out.push_str(host);
    } else if !host.is_empty() {
        if protocol_clean.is_empty() {
            out.push_str("//");
        } else {
            out.push_str(&protocol_clean);
            out.push_str("://");
        }
        out.push_str(host);
        if let Some(port) = port {
            if port != "80" && !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
                out.push(':');
                out.push_str(port);
            }
        }
    }

    if !path.is_empty() {
        out.push('/');
        out.push_str(path.trim_start_matches('/'));
    }
    out
}

/// Reads the string representation of a fixed, closed set of
/// [`Request`] fields for proxy match predicates, plus a fallback into
/// [`Request::extra`] for extension fields (`version`, `protocol`, ...).
/// Restricting match keys this way follows spec §9's design note on
/// "Regex matching on arbitrary fields".
fn field_as_string(request: &Request, field: &str) -> Option<String> {
    match field {
        "base" => Some(request.base.clone()),
        "path" => Some(request.path.clone()),
        "method" => Some(request.method.clone()),
        "adapter" => Some(request.adapter.clone()),
        "url" => Some(request.url.clone()),
        "response_type" => Some(request.response_type.clone()),
        "with_credentials" => Some(request.with_credentials.to_string()),
        "compression" => Some(request.compression.to_string()),
        "timeout" => Some(request.timeout.to_string()),
        _ => request.extra.get(field).and_then(Value::as_scalar_str),
    }
}

/// Merges a single rule field into `request`, recursing into maps, and
/// concatenating arrays, with last-write-wins for everything else.
fn apply_field(request: &mut Request, key: &str, value: Value) {
    match key {
        "base" => {
            if let Some(s) = value.as_scalar_str() {
                request.base = s;
            }
        }
        "path" => {
            if let Some(s) = value.as_scalar_str() {
                request.path = s;
            }
        }
        "method" => {
            if let Some(s) = value.as_scalar_str() {
                request.method = s;
            }
        }
        "adapter" => {
            if let Some(s) = value.as_scalar_str() {
                request.adapter = s;
            }
        }
        "response_type" => {
            if let Some(s) = value.as_scalar_str() {
                request.response_type = s;
            }
        }
        "url" => {
            if let Some(s) = value.as_scalar_str() {
                request.url = s;
            }
        }
        "with_credentials" => {
            if let Value::Bool(b) = value {
                request.with_credentials = b;
            }
        }
        "compression" => {
            if let Value::Bool(b) = value {
                request.compression = b;
            }
        }
        "timeout" => {
            if let Value::Number(n) = value {
                request.timeout = n as u64;
            }
        }
        "headers" => {
            if let Value::Object(map) = value {
                for (k, v) in map {
                    if let Some(s) = v.as_scalar_str() {
                        request.headers.insert(k, s);
                    }
                }
            }
        }
        "ignore" => {
            if let Value::Object(map) = value {
                for (k, v) in map {
                    let existing = request.ignore.remove(&k).unwrap_or(Value::Null);
                    request.ignore.insert(k, merge_value(existing, v));
                }
            }
        }
        "body" => {
            let existing = request.body.take().unwrap_or(Value::Null);
            request.body = Some(merge_value(existing, value));
        }
        _ => {
            let existing = request.extra.remove(key).unwrap_or(Value::Null);
            request.extra.insert(key.to_string(), merge_value(existing, value));
        }
    }
}

fn merge_value(existing: Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::Object(mut a), Value::Object(b)) => {
            for (k, v) in b {
                let merged = merge_value(a.remove(&k).unwrap_or(Value::Null), v);
                a.insert(k, merged);
            }
            Value::Object(a)
        }
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Value::Array(a)
        }
        (_, incoming) => incoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_with_no_matching_rules_is_structurally_equal() {
        let mut proxy = Proxy::new();
        proxy.use_rules([ProxyRule::new()
            .matching("base", "nope")
            .set("protocol", "ftp")]);
        let def = DataDefinition::new("test", "file");
        let req = Request::from_definition(&def);
        let applied = proxy.apply(&req);
        assert_eq!(applied.base, req.base);
        assert_eq!(applied.path, req.path);
        assert_eq!(applied.extra, req.extra);
    }

    #[test]
    fn rule_with_no_match_key_always_applies() {
        let mut proxy = Proxy::new();
        proxy.use_rules([ProxyRule::new().set("protocol", "https")]);
        let def = DataDefinition::new("test", "file");
        let req = Request::from_definition(&def);
        let applied = proxy.apply(&req);
        assert_eq!(
            applied.extra.get("protocol").and_then(Value::as_scalar_str),
            Some("https".to_string())
        );
    }

    #[test]
    fn scenario_single_matching_rule_builds_url() {
        let mut proxy = Proxy::new();
        proxy.use_rules([ProxyRule::new()
            .matching("base", "test")
            .set("protocol", "ftp")
            .set("host", "files.myserver.com")
            .set("port", 21)]);
        let url = proxy.url(UrlInput::base("test", &["file"])).unwrap();
        assert_eq!(url, "ftp://files.myserver.com:21/file");
    }

    #[test]
    fn scenario_last_matching_rule_wins_for_scalars_but_earlier_fields_persist() {
        let mut proxy = Proxy::new();
        proxy.use_rules([
            ProxyRule::new()
                .matching("base", "test")
                .set("protocol", "ftp")
                .set("host", "files.myserver.com")
                .set("port", 21),
            ProxyRule::new()
                .matching("base", "test")
                .set("protocol", "http")
                .set("host", "cache.myserver.com"),
        ]);
        let url = proxy.url(UrlInput::base("test", &["file"])).unwrap();
        assert_eq!(url, "http://cache.myserver.com:21/file");
    }

    #[test]
    fn port_80_is_elided() {
        let mut proxy = Proxy::new();
        proxy.use_rules([ProxyRule::new().set("host", "example.com").set("port", 80)]);
        let url = proxy.url(UrlInput::base("base", &["path"])).unwrap();
        assert_eq!(url, "//example.com/path");
    }

    #[test]
    fn file_protocol_always_has_three_slashes() {
        let mut proxy = Proxy::new();
        proxy.use_rules([ProxyRule::new().set("protocol", "file")]);
        let url = proxy.url(UrlInput::base("base", &["etc/hosts"])).unwrap();
        assert_eq!(url, "file:///etc/hosts");
    }

    #[test]
    fn empty_host_yields_relative_url_with_no_protocol() {
        let proxy = Proxy::new();
        let url = proxy.url(UrlInput::base("base", &["path"])).unwrap();
        assert_eq!(url, "/path");
    }

    #[test]
    fn origin_overrides_protocol_host_port() {
        let mut proxy = Proxy::new();
        proxy.use_rules([ProxyRule::new()
            .set("origin", "https://origin.example.com:9443")
            .set("protocol", "http")
            .set("host", "ignored.example.com")]);
        let url = proxy.url(UrlInput::base("base", &["path"])).unwrap();
        assert_eq!(url, "https://origin.example.com:9443/path");
    }

    #[test]
    fn unparseable_origin_is_invalid_origin_error() {
        let mut proxy = Proxy::new();
        proxy.use_rules([ProxyRule::new().set("origin", "not a url \u{0}")]);
        let err = proxy.url(UrlInput::base("base", &["path"])).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOrigin { .. }));
    }

    #[test]
    fn double_slashes_and_leading_slashes_are_normalized() {
        let proxy = Proxy::new();
        let url = proxy
            .url(UrlInput::base("base", &["//a//", "/b"]))
            .unwrap();
        assert_eq!(url, "/a/b");
    }
}
