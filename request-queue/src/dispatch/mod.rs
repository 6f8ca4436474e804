//! The two dispatcher state machines described in §4.2/§4.3: a single cache-triage
//! worker and a pool of network-fetch workers, both implemented as `tokio` tasks
//! that await their queue's `take()` as the cooperative-yield equivalent of a
//! blocking dequeue.

mod cache_dispatcher;
mod network_dispatcher;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::cache::Cache;
use crate::delivery::ResponseDelivery;
use crate::network::Network;
use crate::queue::RequestQueue;

/// The join handles for a started [`RequestQueue`]'s dispatcher tasks. Dropping
/// this without awaiting the handles is fine — `stop()` on the queue is what
/// actually tells the tasks to return; this is only useful if a caller wants to
/// await a clean drain after stopping.
pub struct DispatcherHandles {
    /// The single cache-triage dispatcher task.
    pub cache: JoinHandle<()>,
    /// The network-dispatch pool, one task per configured worker.
    pub network: Vec<JoinHandle<()>>,
}

/// Start one cache dispatcher and `queue.config.thread_pool_size` network
/// dispatchers against `queue`, using `cache` and `network` as the external
/// collaborators and `delivery` as the execution context responses are posted to.
pub fn spawn_dispatchers<T>(
    queue: Arc<RequestQueue<T>>,
    cache: Arc<dyn Cache>,
    network: Arc<dyn Network<T>>,
    delivery: Arc<dyn ResponseDelivery<T>>,
) -> DispatcherHandles
where
    T: Send + Sync + 'static,
{
    let pool_size = queue.config.thread_pool_size.max(1);

    let cache_handle = tokio::spawn(cache_dispatcher::run(
        queue.clone(),
        cache.clone(),
        delivery.clone(),
    ));

    let network_handles = (0..pool_size)
        .map(|worker_id| {
            tokio::spawn(network_dispatcher::run(
                worker_id,
                queue.clone(),
                network.clone(),
                cache.clone(),
                delivery.clone(),
            ))
        })
        .collect();

    DispatcherHandles { cache: cache_handle, network: network_handles }
}
