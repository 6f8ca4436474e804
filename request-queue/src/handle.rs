use std::sync::Arc;

use crate::cache::Cache;
use crate::config::RequestQueueConfig;
use crate::delivery::ResponseDelivery;
use crate::dispatch::{spawn_dispatchers, DispatcherHandles};
use crate::network::Network;
use crate::queue::RequestQueue;
use crate::request::Request;

/// A started [`RequestQueue`] bundled with its dispatcher tasks: the façade most
/// callers want instead of wiring `RequestQueue::new` and `spawn_dispatchers`
/// together by hand.
pub struct RequestQueueHandle<T> {
    queue: Arc<RequestQueue<T>>,
    dispatchers: DispatcherHandles,
}

impl<T> RequestQueueHandle<T>
where
    T: Send + Sync + 'static,
{
    /// Build a queue from `config` and start its cache and network dispatchers
    /// against `cache`, `network`, and `delivery`.
    pub fn start(
        config: RequestQueueConfig,
        cache: Arc<dyn Cache>,
        network: Arc<dyn Network<T>>,
        delivery: Arc<dyn ResponseDelivery<T>>,
    ) -> Self {
        let queue = RequestQueue::new(config);
        let dispatchers = spawn_dispatchers(queue.clone(), cache, network, delivery);
        RequestQueueHandle { queue, dispatchers }
    }

    /// Admit `request`, returning the `Arc` the caller uses to track or cancel it.
    pub fn submit(&self, request: Request<T>) -> Arc<Request<T>> {
        self.queue.add(request)
    }

    /// Cancel every live request carrying `tag`.
    pub fn cancel_all_by_tag(&self, tag: &str) {
        self.queue.cancel_all_by_tag(tag);
    }

    /// Cancel every live request matching `filter`.
    pub fn cancel_all(&self, filter: impl Fn(&Request<T>) -> bool) {
        self.queue.cancel_all(filter);
    }

    /// Stop accepting further dispatcher progress. See [`RequestQueue::stop`].
    pub fn stop(&self) {
        self.queue.stop();
    }

    /// The underlying dispatcher task handles, for callers that want to await a
    /// clean drain after [`RequestQueueHandle::stop`].
    pub fn dispatchers(&self) -> &DispatcherHandles {
        &self.dispatchers
    }
}
