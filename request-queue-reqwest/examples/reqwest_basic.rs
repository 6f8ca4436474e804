//! A minimal end-to-end walkthrough: submit a GET, observe a cache miss then a
//! cache hit against a local mock server.
//!
//! Run with: cargo run --example reqwest_basic --features request-queue/manager-cacache

use std::sync::Arc;

use request_queue::{
    managers::CaCacheManager, ChannelDelivery, Method, Parsed, Priority, Request,
    RequestQueueConfig, RequestQueueHandle,
};
use request_queue_reqwest::ReqwestNetwork;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::main]
async fn main() {
    env_logger::init();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("hello from the mock server\n")
                .append_header("cache-control", "max-age=60, public"),
        )
        .mount(&mock_server)
        .await;

    let cache_dir = tempdir().expect("tempdir");
    let cache = Arc::new(CaCacheManager::new(cache_dir.path().to_string_lossy()));
    let network = Arc::new(ReqwestNetwork::default());
    let (delivery, mut receiver) = ChannelDelivery::new();
    let delivery = Arc::new(delivery);

    let handle = RequestQueueHandle::start(RequestQueueConfig::default(), cache, network, delivery);

    let url = format!("{}/hello", mock_server.uri()).parse().expect("valid url");
    let request = Request::new(Method::Get, url, |response| {
        Ok(Some(Parsed::new(String::from_utf8_lossy(&response.body).into_owned())))
    })
    .with_priority(Priority::High);
    handle.submit(request);

    if let Some(delivered) = receiver.recv().await {
        match delivered {
            request_queue::Delivered::Response { outcome: Ok(parsed), .. } => {
                println!("got: {}", parsed.result);
            }
            request_queue::Delivered::Response { outcome: Err(err), .. } => {
                eprintln!("request failed: {err}");
            }
            request_queue::Delivered::Intermediate { response, .. } => {
                println!("preview: {}", response.result);
            }
        }
    }

    handle.stop();
}
