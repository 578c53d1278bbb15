//! Tower layer that gates a service through a [`Limiter`].

use crate::limiter::Limiter;
use crate::service::Limited;
use tower_layer::Layer;

/// Layer that runs every call of the wrapped service under a limiter slot.
///
/// All services produced by one layer share the layer's limiter, so the
/// capacity bounds their combined in-flight calls, together with anything
/// else submitted to the same limiter.
#[derive(Clone, Debug)]
pub struct LimiterLayer {
    limiter: Limiter,
}

impl LimiterLayer {
    /// Creates a layer backed by `limiter`.
    ///
    /// # Examples
    ///
    /// ```
    /// use task_limiter::{Limiter, LimiterLayer};
    /// use std::time::Duration;
    ///
    /// let limiter = Limiter::builder()
    ///     .capacity(10)
    ///     .max_wait_duration(Some(Duration::from_secs(5)))
    ///     .build();
    ///
    /// let layer = LimiterLayer::new(limiter.clone());
    /// assert_eq!(layer.limiter().capacity(), 10);
    /// ```
    pub fn new(limiter: Limiter) -> Self {
        Self { limiter }
    }

    /// Returns the limiter shared by the services this layer produces.
    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }
}

impl From<Limiter> for LimiterLayer {
    fn from(limiter: Limiter) -> Self {
        Self::new(limiter)
    }
}

impl<S> Layer<S> for LimiterLayer {
    type Service = Limited<S>;

    fn layer(&self, service: S) -> Self::Service {
        Limited::new(service, self.limiter.clone())
    }
}
