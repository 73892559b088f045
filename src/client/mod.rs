//! Backend request execution.
//!
//! Requests go to the head of a rotating endpoint pool. Transport failures
//! are retried with exponential backoff against the next endpoint; any
//! status of 300 or above is returned to the caller immediately.

mod http;
mod pool;
mod retry;

pub use http::*;
pub use pool::*;
pub use retry::*;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Request error types.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("backend error (status {status}): {body}")]
    Backend { status: u16, body: String },
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("endpoint pool is empty")]
    EmptyPool,
    #[error("transport setup failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single HTTP exchange handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub authorization: Option<String>,
}

/// Status and body of an exchange. Status 0 means no response was received.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: message.into(),
        }
    }
}

/// Sends HTTP requests. Never fails: transport errors map to status 0.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> TransportResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Retryable,
    Fatal,
}

/// Classify a response status.
pub fn classify(status: u16) -> Outcome {
    match status {
        200..=299 => Outcome::Success,
        0..=199 => Outcome::Retryable,
        _ => Outcome::Fatal,
    }
}

/// Executes requests against a rotating pool of backend endpoints.
pub struct RequestExecutor {
    pool: Mutex<EndpointPool>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    authorization: Option<String>,
    route_params: BTreeMap<String, String>,
}

impl RequestExecutor {
    pub fn new(pool: EndpointPool, transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self {
            pool: Mutex::new(pool),
            transport,
            retry,
            authorization: None,
            route_params: BTreeMap::new(),
        }
    }

    /// Attach this `Authorization` header value to every request.
    pub fn with_authorization(mut self, authorization: Option<String>) -> Self {
        self.authorization = authorization;
        self
    }

    /// Route parameters merged into every GET query string.
    pub fn with_route_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.route_params = params;
        self
    }

    /// Take the head of the pool and move it to the tail.
    ///
    /// Concurrent requests interleave their rotations; the pool only
    /// spreads load and is not required to be strictly fair.
    fn next_endpoint(&self) -> String {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rotate()
    }

    fn build_request(&self, method: Method, endpoint: &str, path: &str, params: &[(&str, &str)]) -> HttpRequest {
        let url = format!("{}{}", endpoint, path);

        match method {
            Method::Get => {
                let mut merged: Vec<(String, String)> = self
                    .route_params
                    .iter()
                    .filter(|(k, _)| !params.iter().any(|(p, _)| *p == k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                merged.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));

                HttpRequest {
                    method,
                    url,
                    params: merged,
                    body: None,
                    authorization: self.authorization.clone(),
                }
            }
            Method::Post => {
                let body: Map<String, Value> = params
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                    .collect();

                HttpRequest {
                    method,
                    url,
                    params: Vec::new(),
                    body: Some(Value::Object(body)),
                    authorization: self.authorization.clone(),
                }
            }
        }
    }

    /// Execute a request, retrying transport failures per the retry policy.
    pub async fn execute(&self, method: Method, path: &str, params: &[(&str, &str)]) -> Result<Value, RequestError> {
        let mut delay = self.retry.initial_delay;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let endpoint = self.next_endpoint();
            let request = self.build_request(method, &endpoint, path, params);

            tracing::debug!("Request {:?} {} (attempt {})", method, request.url, attempts);
            let response = self.transport.send(request).await;

            match classify(response.status) {
                Outcome::Success => return decode_body(&response.body),
                Outcome::Fatal => {
                    return Err(RequestError::Backend {
                        status: response.status,
                        body: response.body,
                    })
                }
                Outcome::Retryable => {
                    if self.retry.exhausted(attempts) {
                        return Err(RequestError::RetriesExhausted {
                            attempts,
                            last: format!("status {}: {}", response.status, response.body),
                        });
                    }

                    tracing::warn!(
                        "Request to {} failed (status {}): {}; retrying in {:?}",
                        endpoint,
                        response.status,
                        response.body,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.retry.next_delay(delay);
                }
            }
        }
    }
}

fn decode_body(body: &str) -> Result<Value, RequestError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}
