//! Transports carry protocol requests from the sync client to a service.
//!
//! `LocalTransport` calls a [`Service`] in process and goes through the same
//! JSON encoding as the wire, which keeps client tests honest.
//! `HttpTransport` (feature `client`) talks to a running server.

use crate::error::ClientResult;
use crate::messages::MutationRequest;
use crate::service::Service;
use crate::sheet::Workbook;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Sends reads and mutations, returning the raw response envelope.
///
/// Error envelopes are returned as `Ok` bodies; only failures to reach the
/// service or to parse its answer are errors here.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn read(&self, sheet: &str) -> ClientResult<JsonValue>;

    async fn send(&self, request: &MutationRequest) -> ClientResult<JsonValue>;
}

pub struct LocalTransport<W: Workbook> {
    service: Arc<Service<W>>,
}

impl<W: Workbook> LocalTransport<W> {
    pub fn new(service: Arc<Service<W>>) -> Self {
        LocalTransport { service }
    }

    pub fn service(&self) -> &Arc<Service<W>> {
        &self.service
    }
}

impl<W: Workbook> Clone for LocalTransport<W> {
    fn clone(&self) -> Self {
        LocalTransport {
            service: Arc::clone(&self.service),
        }
    }
}

impl<W: Workbook> Transport for LocalTransport<W> {
    async fn read(&self, sheet: &str) -> ClientResult<JsonValue> {
        Ok(self.service.read(Some(sheet)).body)
    }

    async fn send(&self, request: &MutationRequest) -> ClientResult<JsonValue> {
        let body = serde_json::to_vec(request)?;
        Ok(self.service.mutate_json(&body).body)
    }
}

#[cfg(feature = "client")]
pub use http::HttpTransport;

#[cfg(feature = "client")]
mod http {
    use super::Transport;
    use crate::config::ClientConfig;
    use crate::error::{ClientError, ClientResult};
    use crate::messages::MutationRequest;
    use serde_json::Value as JsonValue;

    fn request_error(e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }

    /// Transport over HTTP with a per-request timeout
    pub struct HttpTransport {
        client: reqwest::Client,
        api_url: String,
    }

    impl HttpTransport {
        pub fn new(config: &ClientConfig) -> ClientResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(config.timeout())
                .build()
                .map_err(request_error)?;
            Ok(HttpTransport {
                client,
                api_url: config.api_url.clone(),
            })
        }

        pub fn api_url(&self) -> &str {
            &self.api_url
        }
    }

    impl Transport for HttpTransport {
        async fn read(&self, sheet: &str) -> ClientResult<JsonValue> {
            let response = self
                .client
                .get(&self.api_url)
                .query(&[("sheet", sheet)])
                .send()
                .await
                .map_err(request_error)?;
            log::debug!("GET {} -> {}", sheet, response.status());
            // error envelopes arrive with 4xx/5xx statuses and are still parsed
            response.json::<JsonValue>().await.map_err(request_error)
        }

        async fn send(&self, request: &MutationRequest) -> ClientResult<JsonValue> {
            let response = self
                .client
                .post(&self.api_url)
                .json(request)
                .send()
                .await
                .map_err(request_error)?;
            log::debug!(
                "POST {} {} -> {}",
                request.action(),
                request.sheet(),
                response.status()
            );
            response.json::<JsonValue>().await.map_err(request_error)
        }
    }
}
