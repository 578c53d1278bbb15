//! Limited service implementation.

use crate::error::LimiterError;
use crate::limiter::Limiter;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower_service::Service;

/// Service that holds a limiter slot for the duration of each call.
#[derive(Clone, Debug)]
pub struct Limited<S> {
    inner: S,
    limiter: Limiter,
}

impl<S> Limited<S> {
    pub(crate) fn new(inner: S, limiter: Limiter) -> Self {
        Self { inner, limiter }
    }

    /// Returns the limiter gating this service.
    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }
}

impl<S, Request> Service<Request> for Limited<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<LimiterError> + Send + 'static,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();
        // Counted now so a join issued after `call` returns waits for it.
        let completion = limiter.track();

        Box::pin(async move {
            let slot = match limiter.config().max_wait_duration {
                Some(max_wait) => limiter.acquire_slot_timeout(max_wait).await?,
                None => limiter.acquire_slot().await,
            };

            let result = inner.call(request).await;

            drop(slot);
            drop(completion);
            result
        })
    }
}
