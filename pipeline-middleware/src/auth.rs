/*
 * Copyright Pipeline Authors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;
use std::sync::Arc;

use pipeline_http::Request;
use pipeline_types::{PipelineError, Response};

use crate::fetch::{BoxFuture, Fetch};

/// Refreshes credentials for a request that was rejected with a 401 (spec
/// §4.D, §6).
pub trait Reauthenticate: Send + Sync {
    fn reauthenticate(&self, request: &Request) -> BoxFuture<'_, Result<(), PipelineError>>;
}

impl<F, Fut> Reauthenticate for F
where
    F: Fn(&Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
{
    fn reauthenticate(&self, request: &Request) -> BoxFuture<'_, Result<(), PipelineError>> {
        Box::pin((self)(request))
    }
}

struct WithAuthentication {
    inner: Arc<dyn Fetch>,
    reauthenticate: Arc<dyn Reauthenticate>,
}

/// On a 401, calls `reauthenticate` and retries the original request
/// exactly once; a second 401 in the same call chain, or a failed
/// reauthentication, rethrows the original error. The `already_retried`
/// flag (rather than open recursion) is what bounds the retry to exactly
/// one attempt per call.
pub fn with_authentication(inner: Arc<dyn Fetch>, reauthenticate: Arc<dyn Reauthenticate>) -> Arc<dyn Fetch> {
    Arc::new(WithAuthentication {
        inner,
        reauthenticate,
    })
}

fn is_unauthorized(error: &PipelineError) -> bool {
    error.response().map(|response| response.status == 401).unwrap_or(false)
}

impl Fetch for WithAuthentication {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineError>> {
        self.attempt(request, false)
    }
}

impl WithAuthentication {
    fn attempt(&self, request: Request, already_retried: bool) -> BoxFuture<'_, Result<Response, PipelineError>> {
        Box::pin(async move {
            match self.inner.call(request.clone()).await {
                Err(error) if !already_retried && is_unauthorized(&error) => {
                    tracing::debug!("401 received; attempting reauthentication");
                    match self.reauthenticate.reauthenticate(&request).await {
                        Ok(()) => self.attempt(request, true).await,
                        Err(_reauth_error) => {
                            tracing::warn!("reauthentication failed; rethrowing original 401");
                            Err(error)
                        }
                    }
                }
                other => other,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::ScriptedFetch;
    use pipeline_http::DataDefinition;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn request() -> Request {
        Request::from_definition(&DataDefinition::new("base", "path")).freeze()
    }

    struct CountingReauth {
        calls: AtomicU32,
        succeeds: bool,
    }

    impl Reauthenticate for CountingReauth {
        fn reauthenticate(&self, _request: &Request) -> BoxFuture<'_, Result<(), PipelineError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let succeeds = self.succeeds;
            Box::pin(async move {
                if succeeds {
                    Ok(())
                } else {
                    Err(PipelineError::invalid_request("reauth failed"))
                }
            })
        }
    }

    #[tokio::test]
    async fn retries_once_after_successful_reauth() {
        let fetch: Arc<dyn Fetch> = Arc::new(ScriptedFetch::new(vec![
            Err(PipelineError::http_error(Response::new(401))),
            Ok(Response::new(200)),
        ]));
        let reauth = Arc::new(CountingReauth {
            calls: AtomicU32::new(0),
            succeeds: true,
        });
        let wrapped = with_authentication(fetch, reauth.clone());
        let response = wrapped.call(request()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(reauth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_401_in_same_chain_is_not_retried_again() {
        let fetch: Arc<dyn Fetch> = Arc::new(ScriptedFetch::new(vec![
            Err(PipelineError::http_error(Response::new(401))),
            Err(PipelineError::http_error(Response::new(401))),
        ]));
        let reauth = Arc::new(CountingReauth {
            calls: AtomicU32::new(0),
            succeeds: true,
        });
        let wrapped = with_authentication(fetch, reauth.clone());
        let err = wrapped.call(request()).await.unwrap_err();
        assert!(is_unauthorized(&err));
        assert_eq!(reauth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_reauth_rethrows_original_error() {
        let fetch: Arc<dyn Fetch> = Arc::new(ScriptedFetch::new(vec![Err(PipelineError::http_error(
            Response::new(401),
        ))]));
        let reauth = Arc::new(CountingReauth {
            calls: AtomicU32::new(0),
            succeeds: false,
        });
        let wrapped = with_authentication(fetch, reauth);
        let err = wrapped.call(request()).await.unwrap_err();
        assert!(is_unauthorized(&err));
    }

    #[tokio::test]
    async fn non_401_errors_are_not_retried() {
        let fetch: Arc<dyn Fetch> = Arc::new(ScriptedFetch::new(vec![Err(PipelineError::http_error(
            Response::new(500),
        ))]));
        let reauth = Arc::new(CountingReauth {
            calls: AtomicU32::new(0),
            succeeds: true,
        });
        let wrapped = with_authentication(fetch, reauth.clone());
        let _ = wrapped.call(request()).await.unwrap_err();
        assert_eq!(reauth.calls.load(Ordering::SeqCst), 0);
    }
}
