use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::QueueError;
use crate::request::{Parsed, Request};

/// A unit of work to run on the delivery target after a response has been handed
/// to it — used to sequence "post the intermediate response, *then* enqueue the
/// refresh" (§4.2) without ever running it before the response it follows.
pub type Continuation = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Posts final/intermediate results to a target execution context (typically a
/// UI thread's event loop). Implementations must never invoke user callbacks
/// synchronously from the calling (dispatcher) task — everything is marshalled
/// onto the delivery target.
#[async_trait]
pub trait ResponseDelivery<T>: Send + Sync + 'static {
    /// Post a final (or error) response, then call `request.finish(...)` on the
    /// delivery target.
    async fn post_response(&self, request: Arc<Request<T>>, response: Parsed<T>);

    /// Post an intermediate response, then run `continuation` on the delivery
    /// target — guaranteed to run *after* the response has been delivered.
    async fn post_response_then(
        &self,
        request: Arc<Request<T>>,
        response: Parsed<T>,
        continuation: Continuation,
    );

    /// Post an error, symmetric to `post_response`.
    async fn post_error(&self, request: Arc<Request<T>>, error: QueueError);
}

/// One item enqueued onto a [`ChannelDelivery`]'s channel, drained by the delivery
/// target (e.g. a UI event loop pumping `recv()` in a loop).
pub enum Delivered<T> {
    /// A final or error outcome for `request`.
    Response {
        /// The request this delivery is for.
        request: Arc<Request<T>>,
        /// `Ok` for success, `Err` for a terminal failure.
        outcome: Result<Parsed<T>, QueueError>,
    },
    /// An intermediate response, plus the continuation to run once the delivery
    /// target has handed `outcome` to the request's listener.
    Intermediate {
        /// The request this delivery is for.
        request: Arc<Request<T>>,
        /// The stale-while-revalidate preview.
        response: Parsed<T>,
        /// Run this on the delivery target immediately after `response` has been
        /// handed to the request's listener.
        continuation: Continuation,
    },
}

/// A [`ResponseDelivery`] that marshals every outcome onto an `mpsc` channel for a
/// single consumer to drain — the channel-backed execution-context model from the
/// design notes, with no dependency on any particular UI toolkit.
pub struct ChannelDelivery<T> {
    sender: mpsc::UnboundedSender<Delivered<T>>,
}

impl<T> ChannelDelivery<T> {
    /// Create a new channel-backed delivery target, returning both halves: the
    /// `ChannelDelivery` to wire into dispatchers, and the receiver the delivery
    /// target drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivered<T>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelDelivery { sender }, receiver)
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> ResponseDelivery<T> for ChannelDelivery<T> {
    async fn post_response(&self, request: Arc<Request<T>>, response: Parsed<T>) {
        let _ = self
            .sender
            .send(Delivered::Response { request, outcome: Ok(response) });
    }

    async fn post_response_then(
        &self,
        request: Arc<Request<T>>,
        response: Parsed<T>,
        continuation: Continuation,
    ) {
        let _ = self.sender.send(Delivered::Intermediate {
            request,
            response,
            continuation,
        });
    }

    async fn post_error(&self, request: Arc<Request<T>>, error: QueueError) {
        let _ = self
            .sender
            .send(Delivered::Response { request, outcome: Err(error) });
    }
}
