use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::config::RequestQueueConfig;
use crate::request::{Ordered, Request};

/// An async, priority-ordered, multi-producer single-consumer-per-`take` channel.
///
/// `push` is synchronous and cheap (a heap insert plus a notify); `take` is the
/// async "blocking" operation dispatchers await on, matching the `queue.take()`
/// suspension point from the concurrency model.
pub(crate) struct PriorityChannel<T> {
    heap: Mutex<BinaryHeap<Ordered<T>>>,
    notify: tokio::sync::Notify,
}

impl<T> PriorityChannel<T> {
    fn new() -> Self {
        PriorityChannel { heap: Mutex::new(BinaryHeap::new()), notify: tokio::sync::Notify::new() }
    }

    pub(crate) fn push(&self, request: Arc<Request<T>>) {
        self.heap.lock().expect("lock poisoned").push(Ordered(request));
        self.notify.notify_one();
    }

    /// Await the next request in priority order, or `None` if `cancel` fires first.
    pub(crate) async fn take(
        &self,
        cancel: &CancellationToken,
    ) -> Option<Arc<Request<T>>> {
        loop {
            if let Some(Ordered(request)) =
                self.heap.lock().expect("lock poisoned").pop()
            {
                return Some(request);
            }
            tokio::select! {
                _ = self.notify.notified() => continue,
                _ = cancel.cancelled() => return None,
            }
        }
    }
}

/// Admission, sequencing, coalescing-by-cache-key, and finish notification for a
/// generation of [`Request`]s sharing a parsed result type `T`.
///
/// A single `RequestQueue` feeds one cache-triage dispatcher and a pool of network
/// dispatchers (see [`crate::dispatch`]); this type only owns the admission and
/// coalescing bookkeeping, not the dispatch loops themselves.
pub struct RequestQueue<T> {
    pub(crate) config: RequestQueueConfig,
    current_requests: Mutex<HashMap<u64, Arc<Request<T>>>>,
    waiting_requests: Mutex<HashMap<String, Option<VecDeque<Arc<Request<T>>>>>>,
    sequence_generator: AtomicU64,
    pub(crate) cache_queue: PriorityChannel<T>,
    pub(crate) network_queue: PriorityChannel<T>,
    pub(crate) cancel_token: CancellationToken,
}

impl<T> RequestQueue<T> {
    /// Create a new, unstarted queue. Call [`crate::dispatch::spawn_dispatchers`] to
    /// start the cache and network dispatchers that actually drain it.
    pub fn new(config: RequestQueueConfig) -> Arc<Self> {
        Arc::new(RequestQueue {
            config,
            current_requests: Mutex::new(HashMap::new()),
            waiting_requests: Mutex::new(HashMap::new()),
            sequence_generator: AtomicU64::new(1),
            cache_queue: PriorityChannel::new(),
            network_queue: PriorityChannel::new(),
            cancel_token: CancellationToken::new(),
        })
    }

    /// Admit a request: assign its sequence number, record it as live, and route it
    /// onto the cache-triage queue (coalescing it with any in-flight request sharing
    /// its cache key) or directly onto the network queue if it opted out of caching.
    pub fn add(self: &Arc<Self>, request: Request<T>) -> Arc<Request<T>> {
        let sequence = self.sequence_generator.fetch_add(1, AtomicOrdering::SeqCst);
        let request = Arc::new(request);
        request.set_sequence(sequence);
        request.apply_default_retry_policy((self.config.default_retry_policy)());

        self.current_requests
            .lock()
            .expect("lock poisoned")
            .insert(sequence, request.clone());

        if !request.should_cache() {
            self.network_queue.push(request.clone());
            return request;
        }

        let key = request.cache_key();
        let mut waiting = self.waiting_requests.lock().expect("lock poisoned");
        match waiting.get_mut(&key) {
            None => {
                waiting.insert(key, None);
                drop(waiting);
                self.cache_queue.push(request.clone());
            }
            Some(waiters) => {
                waiters.get_or_insert_with(VecDeque::new).push_back(request.clone());
            }
        }
        request
    }

    /// Called by a dispatcher at end-of-life for `request` (any terminal
    /// transition: delivered, cancelled-and-discarded, or not-modified-with-prior-
    /// intermediate). Removes it from the live set and, if it was the in-flight
    /// leader for a cache key, promotes every waiter on that key onto the
    /// cache-triage queue so they observe the now-primed cache.
    pub fn finish(self: &Arc<Self>, request: &Arc<Request<T>>) {
        self.current_requests
            .lock()
            .expect("lock poisoned")
            .remove(&request.sequence());

        if !request.should_cache() {
            return;
        }

        let waiters = {
            let mut waiting = self.waiting_requests.lock().expect("lock poisoned");
            waiting.remove(&request.cache_key()).flatten()
        };

        if let Some(waiters) = waiters {
            for waiter in waiters {
                self.cache_queue.push(waiter);
            }
        }
    }

    /// Cancel every live request matching `filter`.
    pub fn cancel_all(&self, filter: impl Fn(&Request<T>) -> bool) {
        for request in self.current_requests.lock().expect("lock poisoned").values()
        {
            if filter(request) {
                request.cancel();
            }
        }
    }

    /// Cancel every live request carrying `tag`.
    pub fn cancel_all_by_tag(&self, tag: &str) {
        self.cancel_all(|request| {
            request.tag().map(|t| t.as_ref() == tag).unwrap_or(false)
        });
    }

    /// Stop accepting further progress: wakes every dispatcher blocked in `take` so
    /// it can observe cancellation and return. Requests already queued are not
    /// guaranteed to be processed.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}
