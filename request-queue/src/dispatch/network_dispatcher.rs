use std::sync::Arc;

use log::{debug, error, trace, warn};

use crate::cache::Cache;
use crate::delivery::ResponseDelivery;
use crate::error::QueueError;
use crate::network::Network;
use crate::queue::RequestQueue;

/// One network-dispatch worker (§4.3): take the next network-bound request,
/// perform the round-trip (the `Network` implementation owns retrying against
/// the request's [`crate::RetryPolicy`]), write the parsed result to cache if
/// eligible, and deliver the outcome.
pub(super) async fn run<T>(
    worker_id: usize,
    queue: Arc<RequestQueue<T>>,
    network: Arc<dyn Network<T>>,
    cache: Arc<dyn Cache>,
    delivery: Arc<dyn ResponseDelivery<T>>,
) where
    T: Send + Sync + 'static,
{
    trace!("network dispatcher {worker_id} starting");

    while let Some(request) = queue.network_queue.take(&queue.cancel_token).await {
        if request.is_cancelled() {
            trace!("network dispatcher {worker_id}: discarding cancelled request {}", request.sequence());
            queue.finish(&request);
            continue;
        }

        let network_response = match network.perform_request(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "network dispatcher {worker_id}: request {} failed: {err}",
                    request.sequence()
                );
                delivery.post_error(request.clone(), err).await;
                queue.finish(&request);
                continue;
            }
        };

        if network_response.not_modified && request.has_had_response_delivered() {
            debug!(
                "network dispatcher {worker_id}: {} not modified, prior delivery already satisfied it",
                request.sequence()
            );
            queue.finish(&request);
            continue;
        }

        match request.parse_network_response(&network_response) {
            Ok(Some(parsed)) => {
                if request.should_cache() {
                    if let Some(entry) = parsed.cache_entry.clone() {
                        if let Err(err) = cache.put(&request.cache_key(), entry).await {
                            error!(
                                "network dispatcher {worker_id}: failed to store cache entry for {}: {err}",
                                request.cache_key()
                            );
                        }
                    }
                }
                request.mark_delivered();
                delivery.post_response(request.clone(), parsed).await;
                queue.finish(&request);
            }
            Ok(None) => {
                debug!(
                    "network dispatcher {worker_id}: parse suppressed delivery for {}",
                    request.sequence()
                );
                queue.finish(&request);
            }
            Err(err) => {
                log_parse_failure(worker_id, &err);
                delivery.post_error(request.clone(), err).await;
                queue.finish(&request);
            }
        }
    }

    trace!("network dispatcher {worker_id} stopping");
}

fn log_parse_failure(worker_id: usize, err: &QueueError) {
    error!("network dispatcher {worker_id}: failed to parse response body: {err}");
}
