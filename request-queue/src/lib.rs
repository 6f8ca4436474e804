//! An async HTTP request dispatch pipeline: priority admission, in-flight
//! coalescing by cache key, stale-while-revalidate delivery, and a pluggable
//! `Cache` / `Network` / `ResponseDelivery` boundary so this crate never speaks
//! a wire protocol or a UI toolkit directly.
//!
//! The shape mirrors a classic two-stage cache-then-network queue: requests are
//! admitted onto a priority queue, triaged by a cache dispatcher, and (on a
//! miss, expiry, or opt-out) handed to a pool of network dispatchers. See
//! [`RequestQueue`] for admission and [`dispatch::spawn_dispatchers`] for
//! starting the workers that drain it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
mod config;
mod delivery;
pub mod dispatch;
mod error;
mod handle;
#[cfg(feature = "manager-cacache")]
pub mod managers;
mod network;
mod queue;
mod request;
mod retry;

pub use cache::{Cache, Entry};
pub use config::{RequestQueueConfig, RetryPolicyFactory};
pub use delivery::{ChannelDelivery, Continuation, Delivered, ResponseDelivery};
pub use dispatch::{spawn_dispatchers, DispatcherHandles};
pub use error::{ErrorKind, QueueError, QueueResult};
pub use handle::RequestQueueHandle;
pub use network::Network;
pub use queue::RequestQueue;
pub use request::{
    Method, NetworkResponse, ParseOutcome, Parsed, Priority, Request, Tag,
};
pub use retry::RetryPolicy;
