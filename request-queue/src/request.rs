use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use url::Url;

use crate::cache::Entry;
use crate::error::QueueResult;
use crate::retry::RetryPolicy;

/// The HTTP method of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
    /// `TRACE`
    Trace,
    /// `PATCH`
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
        };
        write!(f, "{s}")
    }
}

/// Request priority. Higher variants are serviced before lower ones; within the
/// same priority, requests are serviced in admission (sequence) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    /// Background work with no latency requirement.
    Low,
    /// The default priority for ordinary requests.
    #[default]
    Normal,
    /// User-visible work that should preempt `Normal` traffic.
    High,
    /// Must be serviced ahead of everything else (e.g. a user-initiated retry).
    Immediate,
}

/// An opaque identity token used for bulk cancellation via [`crate::RequestQueue::cancel_all_by_tag`].
pub type Tag = Arc<str>;

/// A fresh, successfully parsed response.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    /// The parsed result.
    pub result: T,
    /// The cache entry to (optionally) store alongside this result.
    pub cache_entry: Option<Entry>,
    /// `true` if this is a stale-while-revalidate preview, not the final word on this request.
    pub intermediate: bool,
}

impl<T> Parsed<T> {
    /// Wrap a result with no cache entry, not intermediate.
    pub fn new(result: T) -> Self {
        Parsed { result, cache_entry: None, intermediate: false }
    }

    /// Attach a cache entry to be written alongside this result.
    pub fn with_cache_entry(mut self, entry: Entry) -> Self {
        self.cache_entry = Some(entry);
        self
    }

    /// Mark this result as an intermediate (stale-while-revalidate) preview.
    pub fn intermediate(mut self) -> Self {
        self.intermediate = true;
        self
    }
}

/// The outcome of [`Request::parse_network_response`]: a parsed value, a typed
/// failure to report to the request's error listener, or `Ok(None)` to suppress
/// delivery entirely (the request is finished without calling either listener).
pub type ParseOutcome<T> = QueueResult<Option<Parsed<T>>>;

/// A raw response from [`crate::Network::perform_request`].
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body.
    pub body: bytes::Bytes,
    /// The response headers.
    pub headers: std::collections::HashMap<String, String>,
    /// `true` iff the server replied `304 Not Modified`.
    pub not_modified: bool,
}

/// Per-lifecycle mutable state shared between a [`Request`] and its owning
/// [`crate::RequestQueue`]. Split out from `Request` so it can be held behind a single
/// `Mutex` without requiring `Request` itself to be `Sync` in its user-supplied closures.
#[derive(Debug)]
struct Lifecycle {
    sequence: AtomicU64,
    cancelled: AtomicBool,
    response_delivered: AtomicBool,
    cache_entry: Mutex<Option<Entry>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle {
            sequence: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            response_delivered: AtomicBool::new(false),
            cache_entry: Mutex::new(None),
        }
    }
}

/// Describes one logical HTTP operation, generic over its parsed result type `T`.
///
/// Everything listed under "immutable after submission" in the data model must be set
/// before the request is passed to [`crate::RequestQueue::add`]; the queue itself only
/// ever touches the lifecycle fields (sequence, cancelled, delivered, cache entry).
pub struct Request<T> {
    method: Method,
    url: Url,
    tag: Option<Tag>,
    priority: Priority,
    should_cache: bool,
    retry_policy: Mutex<RetryPolicy>,
    retry_policy_explicit: bool,
    cache_key: Option<String>,
    parse_network_response:
        Box<dyn Fn(&NetworkResponse) -> ParseOutcome<T> + Send + Sync>,
    lifecycle: Lifecycle,
}

impl<T> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("priority", &self.priority)
            .field("should_cache", &self.should_cache)
            .field("sequence", &self.sequence())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl<T> Request<T> {
    /// Begin building a new request. `parse_network_response` is the pure,
    /// deterministic function that turns a [`NetworkResponse`] (or a cached
    /// [`Entry`] replayed as one) into `T`.
    pub fn new(
        method: Method,
        url: Url,
        parse_network_response: impl Fn(&NetworkResponse) -> ParseOutcome<T>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Request {
            method,
            url,
            tag: None,
            priority: Priority::default(),
            should_cache: true,
            retry_policy: Mutex::new(RetryPolicy::default()),
            retry_policy_explicit: false,
            cache_key: None,
            parse_network_response: Box::new(parse_network_response),
            lifecycle: Lifecycle::default(),
        }
    }

    /// Set the bulk-cancellation tag.
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Override the default priority ([`Priority::Normal`]).
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Override the default retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Mutex::new(policy);
        self.retry_policy_explicit = true;
        self
    }

    /// Disable the cache path entirely for this request; it goes straight to the
    /// network queue and is never coalesced with other requests.
    pub fn without_cache(mut self) -> Self {
        self.should_cache = false;
        self
    }

    /// Override the cache key. Defaults to the request URL.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// The request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The bulk-cancellation tag, if any.
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// The request priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// `true` if this request participates in the cache path at all.
    pub fn should_cache(&self) -> bool {
        self.should_cache
    }

    /// The cache key for this request: the override if one was set, else the URL.
    pub fn cache_key(&self) -> String {
        self.cache_key.clone().unwrap_or_else(|| self.url.to_string())
    }

    /// Run the user-supplied parse function against a network response.
    pub fn parse_network_response(
        &self,
        response: &NetworkResponse,
    ) -> ParseOutcome<T> {
        (self.parse_network_response)(response)
    }

    /// The sequence number assigned at admission. `0` until `RequestQueue::add` runs.
    pub fn sequence(&self) -> u64 {
        self.lifecycle.sequence.load(AtomicOrdering::SeqCst)
    }

    pub(crate) fn set_sequence(&self, sequence: u64) {
        self.lifecycle.sequence.store(sequence, AtomicOrdering::SeqCst);
    }

    /// Idempotently mark this request as cancelled. Safe to call any number of times
    /// and from any thread; observed by dispatchers at their next checkpoint.
    pub fn cancel(&self) {
        self.lifecycle.cancelled.store(true, AtomicOrdering::SeqCst);
    }

    /// `true` once [`Request::cancel`] has been called at least once.
    pub fn is_cancelled(&self) -> bool {
        self.lifecycle.cancelled.load(AtomicOrdering::SeqCst)
    }

    /// `true` once a non-intermediate response has been delivered for this request.
    pub fn has_had_response_delivered(&self) -> bool {
        self.lifecycle.response_delivered.load(AtomicOrdering::SeqCst)
    }

    pub(crate) fn mark_delivered(&self) {
        self.lifecycle.response_delivered.store(true, AtomicOrdering::SeqCst);
    }

    /// The cache entry attached during cache-first triage, for conditional
    /// revalidation headers (`If-None-Match` / `If-Modified-Since`).
    pub fn attached_cache_entry(&self) -> Option<Entry> {
        self.lifecycle.cache_entry.lock().expect("lock poisoned").clone()
    }

    pub(crate) fn attach_cache_entry(&self, entry: Entry) {
        *self.lifecycle.cache_entry.lock().expect("lock poisoned") =
            Some(entry);
    }

    /// Fill in the queue's configured default retry policy, unless
    /// [`Request::with_retry_policy`] was already called explicitly. Called once by
    /// [`crate::RequestQueue::add`] at admission time.
    pub(crate) fn apply_default_retry_policy(&self, policy: RetryPolicy) {
        if !self.retry_policy_explicit {
            *self.retry_policy.lock().expect("lock poisoned") = policy;
        }
    }

    /// Consult the retry policy for the next backoff, given the last error.
    /// Returns `Err(last_error)` once retries are exhausted.
    pub fn retry(&self, last_error: QueueResult<()>) -> QueueResult<()> {
        let mut policy = self.retry_policy.lock().expect("lock poisoned");
        policy.retry(last_error)
    }

    /// The current retry timeout, in milliseconds.
    pub fn current_timeout_ms(&self) -> u64 {
        self.retry_policy.lock().expect("lock poisoned").current_timeout_ms()
    }

    /// The number of retries already consumed.
    pub fn current_retry_count(&self) -> u32 {
        self.retry_policy.lock().expect("lock poisoned").current_retry_count()
    }
}

/// An [`Ord`] wrapper giving `(priority desc, sequence asc)` ordering, used as the
/// element type of the internal priority queues. A `BinaryHeap` is a max-heap, so
/// this type's `Ord` impl is written to put the request that should be taken *first*
/// at the top of the heap.
pub(crate) struct Ordered<T>(pub Arc<Request<T>>);

impl<T> Clone for Ordered<T> {
    fn clone(&self) -> Self {
        Ordered(self.0.clone())
    }
}

impl<T> PartialEq for Ordered<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority() == other.0.priority()
            && self.0.sequence() == other.0.sequence()
    }
}

impl<T> Eq for Ordered<T> {}

impl<T> PartialOrd for Ordered<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ordered<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .priority()
            .cmp(&other.0.priority())
            .then_with(|| other.0.sequence().cmp(&self.0.sequence()))
    }
}
