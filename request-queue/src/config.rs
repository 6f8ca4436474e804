use std::fmt;
use std::sync::Arc;

use crate::retry::RetryPolicy;

/// A closure producing a fresh [`RetryPolicy`] for each newly-admitted request that
/// didn't set one explicitly.
pub type RetryPolicyFactory = Arc<dyn Fn() -> RetryPolicy + Send + Sync>;

/// Configuration for a [`crate::RequestQueue`], mirroring the
/// builder-with-closures convention this workspace already uses for its HTTP
/// cache options.
#[derive(Clone)]
pub struct RequestQueueConfig {
    /// Number of network dispatcher tasks to run. Default `4`.
    pub thread_pool_size: usize,
    /// Produces the default retry policy for requests that don't set one.
    /// Default: `RetryPolicy::default` (`2500ms`, `1` retry, `1.0x` backoff).
    pub default_retry_policy: RetryPolicyFactory,
}

impl fmt::Debug for RequestQueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestQueueConfig")
            .field("thread_pool_size", &self.thread_pool_size)
            .field("default_retry_policy", &"Fn() -> RetryPolicy")
            .finish()
    }
}

impl Default for RequestQueueConfig {
    fn default() -> Self {
        RequestQueueConfig {
            thread_pool_size: 4,
            default_retry_policy: Arc::new(RetryPolicy::default),
        }
    }
}
