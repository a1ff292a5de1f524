/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::Arc;

use pipeline_http::Request;
use pipeline_types::{PipelineError, Response, Value};

use crate::fetch::{BoxFuture, Fetch};

/// Optional request/response rewriting hooks (spec §4.D, §6). Both hooks
/// are optional in the source; modeled here as default methods returning
/// `None` ("no replacement") so an implementor only overrides the hook it
/// needs, matching the source's "if the transformer supplies a … hook"
/// phrasing without an `Option<fn>` field per hook.
pub trait Transformer: Send + Sync {
    /// Given the current body and a mutable view of the request headers
    /// (which may be edited in place), returns a replacement body, or
    /// `None` to leave it unchanged.
    fn request(&self, _body: Option<&Value>, _headers: &mut HashMap<String, String>) -> Option<Value> {
        None
    }

    /// Given the response's current data, returns a replacement, or `None`
    /// to leave it unchanged.
    fn response(&self, _data: Option<&Value>) -> Option<Value> {
        None
    }
}

struct WithTransform {
    inner: Arc<dyn Fetch>,
    transformer: Arc<dyn Transformer>,
}

/// Deep-clones the request, runs the transformer's `request` hook (body in,
/// possibly-mutated headers, replacement body out), dispatches through
/// `inner`, then deep-clones the response and runs the `response` hook the
/// same way.
pub fn with_transform(inner: Arc<dyn Fetch>, transformer: Arc<dyn Transformer>) -> Arc<dyn Fetch> {
    Arc::new(WithTransform { inner, transformer })
}

impl Fetch for WithTransform {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            let mut clone = request.clone_for_mutation();
            if let Some(new_body) = self.transformer.request(clone.body.as_ref(), &mut clone.headers) {
                clone.body = Some(new_body);
            }

            let response = self.inner.call(clone).await?;
            let mut modified = response.clone();
            if let Some(new_data) = self.transformer.response(modified.data.as_ref()) {
                modified.data = Some(new_data);
            }
            Ok(modified)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::EchoFetch;
    use pipeline_http::DataDefinition;

    struct UppercaseTransformer;

    impl Transformer for UppercaseTransformer {
        fn request(&self, body: Option<&Value>, headers: &mut HashMap<String, String>) -> Option<Value> {
            headers.insert("x-transformed".to_string(), "true".to_string());
            match body {
                Some(Value::String(s)) => Some(Value::String(s.to_uppercase())),
                _ => None,
            }
        }

        fn response(&self, data: Option<&Value>) -> Option<Value> {
            match data {
                Some(Value::String(s)) => Some(Value::String(format!("{s}!"))),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn request_hook_replaces_body_and_mutates_headers() {
        let mut def = DataDefinition::new("base", "path");
        def.body = Some(Value::String("hello".into()));
        let request = Request::from_definition(&def).freeze();

        let wrapped = with_transform(Arc::new(EchoFetch), Arc::new(UppercaseTransformer));
        let response = wrapped.call(request).await.unwrap();

        let Some(Value::Object(headers)) = response.data else {
            panic!("expected echoed headers");
        };
        assert_eq!(
            headers.get("x-transformed").and_then(Value::as_scalar_str),
            Some("true".to_string())
        );
    }

    #[tokio::test]
    async fn response_hook_rewrites_data() {
        struct StaticDataFetch;
        impl Fetch for StaticDataFetch {
            fn call(&self, _request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
                Box::pin(async move {
                    let mut response = Response::new(200);
                    response.data = Some(Value::String("hi".into()));
                    Ok(response)
                })
            }
        }

        let request = Request::from_definition(&DataDefinition::new("base", "path")).freeze();
        let wrapped = with_transform(Arc::new(StaticDataFetch), Arc::new(UppercaseTransformer));
        let response = wrapped.call(request).await.unwrap();
        assert_eq!(response.data, Some(Value::String("hi!".into())));
    }
}
