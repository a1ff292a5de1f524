/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use pipeline_types::Value;
use regex::Regex;
use std::sync::OnceLock;

/// Caller-supplied parameter map for [`tokenize`]. Preserves insertion order
/// so residual querystring entries come out in the order the caller put
/// them in, matching the source's iteration-order contract.
pub type Params = IndexMap<String, Value>;

/// Characters to percent-encode in querystring keys/values, beyond the
/// reserved set `percent-encoding`'s `NON_ALPHANUMERIC` would also escape
/// (we want `-_.~` to survive, matching typical `encodeURIComponent`
/// behavior).
const QUERY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'@')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'|')
    .add(b'\\');

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":([A-Za-z0-9_]+)").unwrap())
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE_SET).to_string()
}

/// Substitutes `:name` tokens in `template` with values from `params` and
/// appends any remaining entries as a querystring.
///
/// `params` is shallow-cloned internally; the caller's map is never mutated.
/// Token matching is greedy over `[A-Za-z0-9_]+` (see `token_pattern`);
/// falsy-value querystring semantics (`false` -> `key=false`, `null` -> bare
/// `key`, arrays -> repeated `key=v`) and `?`/`&` separator handling strip a
/// trailing empty separator.
pub fn tokenize(template: &str, params: &Params) -> String {
    let mut remaining = params.clone();

    let substituted = token_pattern().replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        match remaining.shift_remove(name) {
            Some(value) => value.as_scalar_str().unwrap_or_default(),
            None => caps[0].to_string(),
        }
    });

    let mut url = substituted.into_owned();
    let mut pairs: Vec<String> = Vec::new();
    for (key, value) in remaining {
        append_pairs(&mut pairs, &key, &value);
    }

    if pairs.is_empty() {
        return url;
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    url.push(separator);
    url.push_str(&pairs.join("&"));

    let trimmed = url.trim_end_matches(['?', '&']);
    trimmed.to_string()
}

fn append_pairs(pairs: &mut Vec<String>, key: &str, value: &Value) {
    let encoded_key = encode(key);
    match value {
        Value::Array(items) => {
            for item in items {
                append_pairs(pairs, key, item);
            }
        }
        Value::Null => pairs.push(encoded_key),
        Value::Object(_) => {
            // Nested maps/objects are not serialized; caller responsibility.
        }
        other => {
            if let Some(scalar) = other.as_scalar_str() {
                pairs.push(format!("{encoded_key}={}", encode(&scalar)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: Vec<(&str, Value)>) -> Params {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn simple_token_substitution() {
        let p = params(vec![("id", Value::String("0012391".into()))]);
        assert_eq!(tokenize("/clients/:id/apps", &p), "/clients/0012391/apps");
    }

    #[test]
    fn leftover_array_param_becomes_repeated_query_entries() {
        let p = params(vec![
            ("guid", Value::String("00123456789123456789".into())),
            (
                "order",
                Value::Array(vec![
                    Value::String("displayName".into()),
                    Value::String("branch".into()),
                ]),
            ),
        ]);
        assert_eq!(
            tokenize("/users/:guid/clients", &p),
            "/users/00123456789123456789/clients?order=displayName&order=branch"
        );
    }

    #[test]
    fn unmatched_token_is_left_in_place() {
        let p = params(vec![]);
        assert_eq!(tokenize("/clients/:id/apps", &p), "/clients/:id/apps");
    }

    #[test]
    fn null_renders_as_bare_key() {
        let p = params(vec![("flag", Value::Null)]);
        assert_eq!(tokenize("/path", &p), "/path?flag");
    }

    #[test]
    fn false_renders_with_equals() {
        let p = params(vec![("flag", Value::Bool(false))]);
        assert_eq!(tokenize("/path", &p), "/path?flag=false");
    }

    #[test]
    fn existing_querystring_uses_ampersand_separator() {
        let p = params(vec![("b", Value::Number(2.0))]);
        assert_eq!(tokenize("/path?a=1", &p), "/path?a=1&b=2");
    }

    #[test]
    fn empty_remaining_map_does_not_append_separator() {
        let p = params(vec![]);
        assert_eq!(tokenize("/path", &p), "/path");
    }

    #[test]
    fn does_not_mutate_callers_map() {
        let p = params(vec![("id", Value::String("1".into()))]);
        let before = p.clone();
        let _ = tokenize("/clients/:id", &p);
        assert_eq!(p, before);
    }

    #[test]
    fn matched_key_is_removed_and_unmatched_keys_remain() {
        let p = params(vec![
            ("id", Value::String("1".into())),
            ("extra", Value::String("2".into())),
        ]);
        assert_eq!(tokenize("/clients/:id", &p), "/clients/1?extra=2");
    }
}
