use std::sync::Arc;

use log::{debug, error, trace};

use crate::cache::Cache;
use crate::delivery::{Continuation, ResponseDelivery};
use crate::queue::RequestQueue;
use crate::request::{NetworkResponse, Request};

/// The cache-triage loop (§4.2): take the next cache-bound request, look it up,
/// and either serve it straight from cache, hand it to the network queue, or
/// serve a stale-while-revalidate preview and hand a continuation to the
/// delivery target that enqueues the refresh only after that preview lands.
pub(super) async fn run<T>(
    queue: Arc<RequestQueue<T>>,
    cache: Arc<dyn Cache>,
    delivery: Arc<dyn ResponseDelivery<T>>,
) where
    T: Send + Sync + 'static,
{
    if let Err(err) = cache.initialize().await {
        error!("cache dispatcher: failed to initialize cache backend: {err}");
        return;
    }

    while let Some(request) = queue.cache_queue.take(&queue.cancel_token).await {
        if request.is_cancelled() {
            trace!("cache dispatcher: discarding cancelled request {}", request.sequence());
            queue.finish(&request);
            continue;
        }

        let key = request.cache_key();
        match cache.get(&key).await {
            Ok(None) => {
                debug!("cache miss for {key}");
                queue.network_queue.push(request);
            }
            Ok(Some(entry)) if entry.is_expired() => {
                debug!("cache entry expired for {key}");
                request.attach_cache_entry(entry);
                queue.network_queue.push(request);
            }
            Ok(Some(entry)) => {
                let synthetic = NetworkResponse {
                    status: 200,
                    body: entry.data.clone().into(),
                    headers: entry.headers.clone(),
                    not_modified: false,
                };
                match request.parse_network_response(&synthetic) {
                    Ok(Some(parsed)) if entry.refresh_needed() => {
                        debug!("cache hit (soft-expired) for {key}, refreshing in background");
                        request.attach_cache_entry(entry);
                        deliver_intermediate(&queue, &delivery, request, parsed.intermediate())
                            .await;
                    }
                    Ok(Some(parsed)) => {
                        debug!("cache hit (fresh) for {key}");
                        request.mark_delivered();
                        delivery.post_response(request.clone(), parsed).await;
                        queue.finish(&request);
                    }
                    Ok(None) => {
                        debug!("parse suppressed delivery for cached entry {key}");
                        queue.finish(&request);
                    }
                    Err(err) => {
                        error!("failed to replay cache entry for {key}: {err}");
                        delivery.post_error(request.clone(), err).await;
                        queue.finish(&request);
                    }
                }
            }
            Err(err) => {
                error!("cache backend error for {key}: {err}");
                delivery.post_error(request.clone(), err).await;
                queue.finish(&request);
            }
        }
    }
}

async fn deliver_intermediate<T>(
    queue: &Arc<RequestQueue<T>>,
    delivery: &Arc<dyn ResponseDelivery<T>>,
    request: Arc<Request<T>>,
    preview: crate::request::Parsed<T>,
) where
    T: Send + Sync + 'static,
{
    request.mark_delivered();
    let queue = queue.clone();
    let refresh_target = request.clone();
    let continuation: Continuation =
        Box::pin(async move { queue.network_queue.push(refresh_target) });
    delivery
        .post_response_then(request, preview, continuation)
        .await;
}
