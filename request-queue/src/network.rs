use async_trait::async_trait;

use crate::error::QueueResult;
use crate::request::{NetworkResponse, Request};

/// Executes one HTTP round-trip, honoring the request's [`crate::RetryPolicy`].
///
/// This is the boundary to an external transport — this crate only ever calls
/// `perform_request` and never speaks a wire protocol itself. An implementation is
/// expected to consult `request.retry(..)` internally on each retry-eligible
/// failure (connection failure, timeout, 5xx where applicable, or 401 with a
/// synchronous re-auth opportunity) and keep retrying until the policy is
/// exhausted, at which point it returns the terminal error.
#[async_trait]
pub trait Network<T>: Send + Sync + 'static {
    /// Perform the round-trip described by `request`, applying conditional
    /// revalidation headers from any attached cache entry.
    async fn perform_request(
        &self,
        request: &Request<T>,
    ) -> QueueResult<NetworkResponse>;
}
