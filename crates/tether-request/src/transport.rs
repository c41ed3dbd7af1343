//! HTTP transport over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderValue;
use tether_core::{HttpResponse, HttpTransport, Method, OutboundRequest, TransportError};

/// Production [`HttpTransport`].
///
/// `Authorization` header values are marked sensitive so they never show up
/// in `reqwest` debug output.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport over an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Http(Box::new(e)))?;
        Ok(Self { client })
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest(request.method), request.url.as_str());

        for (name, value) in &request.headers {
            let mut value =
                HeaderValue::from_str(value).map_err(|e| TransportError::Http(Box::new(e)))?;
            if name.eq_ignore_ascii_case("authorization") {
                value.set_sensitive(true);
            }
            builder = builder.header(name.as_str(), value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Http(Box::new(e)))?;

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
            .text()
            .await
            .map_err(|e| TransportError::Http(Box::new(e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_map_to_reqwest() {
        assert_eq!(to_reqwest(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(to_reqwest(Method::Delete), reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn invalid_header_value_is_a_transport_error() {
        let transport = ReqwestTransport::new();
        let request = OutboundRequest {
            method: Method::Get,
            url: "http://127.0.0.1:1/".into(),
            headers: vec![("x-bad".into(), "line\nbreak".into())],
            body: None,
        };
        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = ReqwestTransport::new();
        let request = OutboundRequest {
            method: Method::Get,
            url: "http://127.0.0.1:1/".into(),
            headers: Vec::new(),
            body: None,
        };
        assert!(transport.send(&request).await.is_err());
    }
}
