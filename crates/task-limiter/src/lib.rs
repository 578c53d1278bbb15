//! Bounded-concurrency limiter for Tokio.
//!
//! A [`Limiter`] owns a fixed number of slots. Work submitted to it runs on
//! its own task, but only while holding a slot, so at most `capacity` pieces
//! of work run at once. Submission never waits; [`Limiter::join`] waits for
//! everything submitted so far.
//!
//! # Basic Example
//!
//! ```rust
//! use task_limiter::Limiter;
//! use std::time::Duration;
//!
//! # async fn example() {
//! // At most 3 downloads at a time
//! let limiter = Limiter::new(3);
//!
//! for id in 0..10 {
//!     limiter.submit(async move {
//!         tokio::time::sleep(Duration::from_millis(100)).await;
//!         println!("download {} done", id);
//!     });
//! }
//!
//! // Returns once all 10 have finished
//! limiter.join().await;
//! # }
//! ```
//!
//! # Blocking Work
//!
//! Synchronous closures run on Tokio's blocking pool under the same slots:
//!
//! ```rust
//! use task_limiter::Limiter;
//!
//! # async fn example() {
//! let limiter = Limiter::builder().capacity(2).name("hashing").build();
//!
//! for chunk in 0..8u64 {
//!     limiter.submit_blocking(move || {
//!         let _digest = (0..1_000_000u64).fold(chunk, |acc, x| acc.wrapping_mul(31) ^ x);
//!     });
//! }
//!
//! limiter.join().await;
//! # }
//! ```
//!
//! # Manual Slots
//!
//! Slots can be taken directly, either as a guard that frees the slot on drop
//! or as a bare reservation paired with [`Limiter::release`]:
//!
//! ```rust
//! use task_limiter::Limiter;
//!
//! # async fn example() {
//! let limiter = Limiter::new(1);
//!
//! {
//!     let _slot = limiter.acquire_slot().await;
//!     // critical section
//! }
//!
//! limiter.acquire().await;
//! // critical section
//! limiter.release();
//! # }
//! ```
//!
//! # Tower Services
//!
//! [`LimiterLayer`] puts each call of a service under a slot. Those calls
//! share the limiter with submitted tasks and are waited for by `join`:
//!
//! ```rust
//! use task_limiter::{Limiter, LimiterError, LimiterLayer};
//! use tower::ServiceBuilder;
//!
//! # async fn example() {
//! let limiter = Limiter::new(10);
//!
//! let service = ServiceBuilder::new()
//!     .layer(LimiterLayer::new(limiter.clone()))
//!     .service_fn(|req: String| async move {
//!         Ok::<_, LimiterError>(req)
//!     });
//! # }
//! ```
//!
//! # Failure Handling
//!
//! Submitted work has no result channel. A task that panics still frees its
//! slot and still counts as finished, so a panic can neither shrink the pool
//! nor hang `join`. Panics are reported through
//! [`LimiterConfigBuilder::on_task_panicked`] and, with the `tracing` feature,
//! a warning.
//!
//! # Degenerate Capacity
//!
//! A limiter built with capacity zero is valid but never hands out a slot:
//! every `acquire` and every submitted task waits forever, and so does a
//! `join` with anything outstanding.

pub mod config;
pub mod error;
pub mod events;
pub mod layer;
pub mod limiter;
pub mod service;
pub mod wait_group;

pub use config::{LimiterConfig, LimiterConfigBuilder};
pub use error::{LimiterError, Result};
pub use events::TaskEvent;
pub use layer::LimiterLayer;
pub use limiter::{Limiter, SlotGuard};
pub use service::Limited;
pub use wait_group::{CompletionGuard, WaitGroup};
