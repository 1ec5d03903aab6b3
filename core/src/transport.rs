//! `Transport` backed by `reqwest`.
//!
//! Enabled with the `reqwest` feature. Timeouts and TLS settings belong to
//! the `reqwest::Client` the caller passes in.

use std::future::Future;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        async move {
            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.text().await.map_err(map_reqwest_error)?;
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::new(format!("request timed out: {e}"))
    } else if e.is_connect() {
        TransportError::new(format!("could not connect: {e}"))
    } else {
        TransportError::new(format!("request failed: {e}"))
    }
}
