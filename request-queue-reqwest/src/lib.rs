#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! A [`request_queue::Network`] implementation backed by [`reqwest`].
//!
//! Retrying lives here, not in `request-queue` itself: this is the boundary the
//! core crate expects a transport to own, consulting the request's
//! [`request_queue::RetryPolicy`] on every retry-eligible failure and returning
//! the terminal error once it's exhausted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use reqwest::{Method as ReqwestMethod, StatusCode};
use request_queue::{Method, Network, NetworkResponse, QueueError, QueueResult, Request};

/// Performs requests with a plain [`reqwest::Client`], applying conditional
/// revalidation headers from any cache entry attached to the request and
/// retrying according to the request's retry policy.
#[derive(Debug, Clone)]
pub struct ReqwestNetwork {
    client: reqwest::Client,
}

impl ReqwestNetwork {
    /// Wrap an existing [`reqwest::Client`].
    pub fn new(client: reqwest::Client) -> Self {
        ReqwestNetwork { client }
    }
}

impl Default for ReqwestNetwork {
    fn default() -> Self {
        ReqwestNetwork { client: reqwest::Client::new() }
    }
}

fn to_reqwest_method(method: Method) -> ReqwestMethod {
    match method {
        Method::Get => ReqwestMethod::GET,
        Method::Post => ReqwestMethod::POST,
        Method::Put => ReqwestMethod::PUT,
        Method::Delete => ReqwestMethod::DELETE,
        Method::Head => ReqwestMethod::HEAD,
        Method::Options => ReqwestMethod::OPTIONS,
        Method::Trace => ReqwestMethod::TRACE,
        Method::Patch => ReqwestMethod::PATCH,
    }
}

fn classify_transport_error(err: &reqwest::Error) -> QueueError {
    if err.is_timeout() {
        QueueError::timeout(err.to_string())
    } else if err.is_connect() {
        QueueError::no_connection(err.to_string())
    } else {
        QueueError::network(err.to_string())
    }
}

fn classify_status_error(status: StatusCode) -> QueueError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        QueueError::auth(format!("server responded {status}"))
    } else if status.is_server_error() {
        QueueError::server(format!("server responded {status}"))
    } else {
        QueueError::network(format!("server responded {status}"))
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Network<T> for ReqwestNetwork {
    async fn perform_request(
        &self,
        request: &Request<T>,
    ) -> QueueResult<NetworkResponse> {
        loop {
            let mut builder =
                self.client.request(to_reqwest_method(request.method()), request.url().clone());

            if let Some(entry) = request.attached_cache_entry() {
                if let Some(etag) = entry.etag.as_deref() {
                    if let Ok(value) = HeaderValue::from_str(etag) {
                        builder = builder.header(IF_NONE_MATCH, value);
                    }
                }
                let date = httpdate::fmt_http_date(
                    std::time::UNIX_EPOCH + Duration::from_millis(entry.server_date),
                );
                if let Ok(value) = HeaderValue::from_str(&date) {
                    builder = builder.header(IF_MODIFIED_SINCE, value);
                }
            }

            let timeout = Duration::from_millis(request.current_timeout_ms());
            let outcome = builder.timeout(timeout).send().await;

            let error = match outcome {
                Ok(response) if response.status() == StatusCode::NOT_MODIFIED => {
                    return Ok(NetworkResponse {
                        status: StatusCode::NOT_MODIFIED.as_u16(),
                        body: bytes::Bytes::new(),
                        headers: Default::default(),
                        not_modified: true,
                    });
                }
                Ok(response) if response.status().is_success() => {
                    let status = response.status().as_u16();
                    let headers = response
                        .headers()
                        .iter()
                        .filter_map(|(name, value)| {
                            value
                                .to_str()
                                .ok()
                                .map(|v| (name.as_str().to_owned(), v.to_owned()))
                        })
                        .collect();
                    let body = response
                        .bytes()
                        .await
                        .map_err(|err| classify_transport_error(&err))?;
                    return Ok(NetworkResponse { status, body, headers, not_modified: false });
                }
                Ok(response) => classify_status_error(response.status()),
                Err(err) => classify_transport_error(&err),
            };

            log::warn!(
                "request-queue-reqwest: attempt {} for {} failed: {error}",
                request.current_retry_count(),
                request.url()
            );

            request.retry(Err(error))?;
            tokio::time::sleep(Duration::from_millis(request.current_timeout_ms())).await;
        }
    }
}
