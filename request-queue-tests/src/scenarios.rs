use std::sync::Arc;
use std::time::Duration;

use request_queue::{
    spawn_dispatchers, ChannelDelivery, Delivered, Entry, Method, Parsed, Priority, Request,
    RequestQueue, RequestQueueConfig,
};
use request_queue_reqwest::ReqwestNetwork;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::InMemoryCache;

fn queue_with_pool_size(size: usize) -> Arc<RequestQueue<String>> {
    RequestQueue::new(RequestQueueConfig { thread_pool_size: size, ..Default::default() })
}

fn cacheable_request(
    url: url::Url,
    ttl_ms: u64,
    soft_ttl_ms: u64,
) -> Request<String> {
    Request::new(Method::Get, url, move |response| {
        let body = String::from_utf8_lossy(&response.body).into_owned();
        let entry = Entry::new(response.body.to_vec(), response.headers.clone(), ttl_ms, soft_ttl_ms);
        Ok(Some(Parsed::new(body).with_cache_entry(entry)))
    })
}

fn uncacheable_request(url: url::Url) -> Request<String> {
    Request::new(Method::Get, url, |response| {
        Ok(Some(Parsed::new(String::from_utf8_lossy(&response.body).into_owned())))
    })
    .without_cache()
}

/// Cache miss: first request for a URL goes to the network and the result is
/// stored for next time.
#[tokio::test]
async fn cache_miss_falls_through_to_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/miss"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let queue = queue_with_pool_size(1);
    let (delivery, mut receiver) = ChannelDelivery::new();
    let _handles = spawn_dispatchers(
        queue.clone(),
        Arc::new(InMemoryCache::default()),
        Arc::new(ReqwestNetwork::default()),
        Arc::new(delivery),
    );

    let url = format!("{}/miss", mock_server.uri()).parse().unwrap();
    queue.add(cacheable_request(url, 60_000, 60_000));

    match receiver.recv().await.expect("a delivery") {
        Delivered::Response { outcome: Ok(parsed), .. } => assert_eq!(parsed.result, "first"),
        other => panic!("unexpected delivery: {:?}", other.describe()),
    }

    mock_server.verify().await;
}

/// A second request for a still-fresh cache key is served without another
/// network round-trip.
#[tokio::test]
async fn fresh_cache_entry_is_served_without_refetch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("cached-body"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let queue = queue_with_pool_size(1);
    let (delivery, mut receiver) = ChannelDelivery::new();
    let _handles = spawn_dispatchers(
        queue.clone(),
        Arc::new(InMemoryCache::default()),
        Arc::new(ReqwestNetwork::default()),
        Arc::new(delivery),
    );

    let url: url::Url = format!("{}/fresh", mock_server.uri()).parse().unwrap();
    queue.add(cacheable_request(url.clone(), 60_000, 60_000));
    let first = receiver.recv().await.expect("first delivery");
    assert!(matches!(first, Delivered::Response { outcome: Ok(_), .. }));

    queue.add(cacheable_request(url, 60_000, 60_000));
    let second = receiver.recv().await.expect("second delivery");
    match second {
        Delivered::Response { outcome: Ok(parsed), .. } => {
            assert_eq!(parsed.result, "cached-body");
        }
        other => panic!("unexpected delivery: {:?}", other.describe()),
    }

    mock_server.verify().await;
}

/// A soft-expired entry is delivered immediately as an intermediate preview,
/// followed by a final response once the background refresh completes.
#[tokio::test]
async fn soft_expired_entry_delivers_preview_then_refresh() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stale"))
        .respond_with(ResponseTemplate::new(200).set_body_string("refreshed"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let queue = queue_with_pool_size(1);
    let (delivery, mut receiver) = ChannelDelivery::new();
    let _handles = spawn_dispatchers(
        queue.clone(),
        Arc::new(InMemoryCache::default()),
        Arc::new(ReqwestNetwork::default()),
        Arc::new(delivery),
    );

    let url: url::Url = format!("{}/stale", mock_server.uri()).parse().unwrap();
    // ttl far in the future, soft_ttl already in the past.
    queue.add(cacheable_request(url.clone(), 60_000, 0));
    let initial = receiver.recv().await.expect("initial delivery");
    assert!(matches!(initial, Delivered::Response { outcome: Ok(_), .. }));

    tokio::time::sleep(Duration::from_millis(5)).await;

    queue.add(cacheable_request(url, 60_000, 0));

    match receiver.recv().await.expect("preview delivery") {
        Delivered::Intermediate { response, .. } => assert_eq!(response.result, "refreshed"),
        other => panic!("expected an intermediate preview, got {:?}", other.describe()),
    }
    match receiver.recv().await.expect("final delivery") {
        Delivered::Response { outcome: Ok(parsed), .. } => assert_eq!(parsed.result, "refreshed"),
        other => panic!("unexpected delivery: {:?}", other.describe()),
    }

    mock_server.verify().await;
}

/// Two requests admitted back-to-back for the same cache key coalesce into a
/// single network round-trip; both still receive their own delivery.
#[tokio::test]
async fn requests_sharing_a_cache_key_coalesce_onto_one_fetch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coalesce"))
        .respond_with(ResponseTemplate::new(200).set_body_string("shared"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let queue = queue_with_pool_size(2);
    let (delivery, mut receiver) = ChannelDelivery::new();
    let _handles = spawn_dispatchers(
        queue.clone(),
        Arc::new(InMemoryCache::default()),
        Arc::new(ReqwestNetwork::default()),
        Arc::new(delivery),
    );

    let url: url::Url = format!("{}/coalesce", mock_server.uri()).parse().unwrap();
    queue.add(cacheable_request(url.clone(), 60_000, 60_000));
    queue.add(cacheable_request(url, 60_000, 60_000));

    for _ in 0..2 {
        match receiver.recv().await.expect("a delivery") {
            Delivered::Response { outcome: Ok(parsed), .. } => {
                assert_eq!(parsed.result, "shared");
            }
            other => panic!("unexpected delivery: {:?}", other.describe()),
        }
    }

    mock_server.verify().await;
}

/// Cancelling a request before it is dequeued suppresses delivery entirely.
#[tokio::test]
async fn cancelling_before_dispatch_suppresses_delivery() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_string("should-not-arrive"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let queue = queue_with_pool_size(1);
    let (delivery, mut receiver) = ChannelDelivery::new();
    let _handles = spawn_dispatchers(
        queue.clone(),
        Arc::new(InMemoryCache::default()),
        Arc::new(ReqwestNetwork::default()),
        Arc::new(delivery),
    );

    let url: url::Url = format!("{}/cancel", mock_server.uri()).parse().unwrap();
    let request = queue.add(uncacheable_request(url));
    request.cancel();

    let outcome = tokio::time::timeout(Duration::from_millis(50), receiver.recv()).await;
    assert!(outcome.is_err(), "expected no delivery before the timeout elapsed");

    mock_server.verify().await;
}

/// A single network worker services a `High` priority request ahead of a `Low`
/// one admitted earlier.
#[tokio::test]
async fn higher_priority_requests_are_serviced_first() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/low"))
        .respond_with(ResponseTemplate::new(200).set_body_string("low"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/high"))
        .respond_with(ResponseTemplate::new(200).set_body_string("high"))
        .mount(&mock_server)
        .await;

    let queue = queue_with_pool_size(1);
    let (delivery, mut receiver) = ChannelDelivery::new();
    let _handles = spawn_dispatchers(
        queue.clone(),
        Arc::new(InMemoryCache::default()),
        Arc::new(ReqwestNetwork::default()),
        Arc::new(delivery),
    );

    let low_url: url::Url = format!("{}/low", mock_server.uri()).parse().unwrap();
    let high_url: url::Url = format!("{}/high", mock_server.uri()).parse().unwrap();

    queue.add(uncacheable_request(low_url).with_priority(Priority::Low));
    queue.add(uncacheable_request(high_url).with_priority(Priority::High));

    match receiver.recv().await.expect("first delivery") {
        Delivered::Response { outcome: Ok(parsed), .. } => assert_eq!(parsed.result, "high"),
        other => panic!("unexpected delivery: {:?}", other.describe()),
    }
    match receiver.recv().await.expect("second delivery") {
        Delivered::Response { outcome: Ok(parsed), .. } => assert_eq!(parsed.result, "low"),
        other => panic!("unexpected delivery: {:?}", other.describe()),
    }
}

/// A `304` arriving for the background refresh that follows an intermediate
/// preview must be suppressed, not delivered as a second (empty-body) response.
#[tokio::test]
async fn not_modified_refresh_after_intermediate_is_suppressed() {
    let mock_server = MockServer::start().await;
    let seed_mock = Mock::given(method("GET"))
        .and(path("/stale-304"))
        .respond_with(ResponseTemplate::new(200).set_body_string("seed"))
        .expect(1);
    let seed_guard = mock_server.register_as_scoped(seed_mock).await;

    let queue = queue_with_pool_size(1);
    let (delivery, mut receiver) = ChannelDelivery::new();
    let _handles = spawn_dispatchers(
        queue.clone(),
        Arc::new(InMemoryCache::default()),
        Arc::new(ReqwestNetwork::default()),
        Arc::new(delivery),
    );

    let url: url::Url = format!("{}/stale-304", mock_server.uri()).parse().unwrap();
    // ttl far in the future, soft_ttl already in the past: seeds the cache.
    queue.add(cacheable_request(url.clone(), 60_000, 0));
    let initial = receiver.recv().await.expect("initial delivery");
    assert!(matches!(initial, Delivered::Response { outcome: Ok(_), .. }));

    drop(seed_guard);
    let not_modified_mock = Mock::given(method("GET"))
        .and(path("/stale-304"))
        .respond_with(ResponseTemplate::new(304))
        .expect(1);
    let _not_modified_guard = mock_server.register_as_scoped(not_modified_mock).await;

    tokio::time::sleep(Duration::from_millis(5)).await;

    queue.add(cacheable_request(url, 60_000, 0));

    match receiver.recv().await.expect("preview delivery") {
        Delivered::Intermediate { response, .. } => assert_eq!(response.result, "seed"),
        other => panic!("expected an intermediate preview, got {:?}", other.describe()),
    }

    let outcome = tokio::time::timeout(Duration::from_millis(200), receiver.recv()).await;
    assert!(outcome.is_err(), "a 304 following an intermediate preview must not deliver again");
}

trait DescribeForPanic {
    fn describe(&self) -> &'static str;
}

impl<T> DescribeForPanic for Delivered<T> {
    fn describe(&self) -> &'static str {
        match self {
            Delivered::Response { outcome: Ok(_), .. } => "Response(Ok)",
            Delivered::Response { outcome: Err(_), .. } => "Response(Err)",
            Delivered::Intermediate { .. } => "Intermediate",
        }
    }
}
