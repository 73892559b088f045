//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use super::{HttpRequest, Method, RequestError, Transport, TransportResponse};

/// HTTP transport using a shared reqwest client.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, RequestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> TransportResponse {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(auth) = &request.authorization {
            builder = builder.header(AUTHORIZATION, auth.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => return TransportResponse::network_error(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => TransportResponse { status, body },
            Err(e) => TransportResponse::network_error(e.to_string()),
        }
    }
}
