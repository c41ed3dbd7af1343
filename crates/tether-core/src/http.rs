//! Request/response boundary.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported HTTP method '{other}'")),
        }
    }
}

/// A fully prepared request, headers included.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// Method.
    pub method: Method,
    /// Absolute target URL.
    pub url: String,
    /// Header name/value pairs, in send order.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

/// A completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Body text.
    pub body: String,
}

impl HttpResponse {
    /// Response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is 429 Too Many Requests.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Sends one request and returns the response, whatever its status.
///
/// Implementations must not retry; retry policy belongs to the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Transmit `request`.
    ///
    /// Non-2xx statuses are returned as `Ok`; only failures to obtain a
    /// response are errors.
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_round_trips_through_str() {
        for m in [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Patch,
            Method::Delete,
        ] {
            assert_eq!(m.as_str().parse::<Method>().unwrap(), m);
        }
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn status_classification() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
        assert!(HttpResponse::new(429, "").is_rate_limited());
        assert!(!HttpResponse::new(429, "").is_success());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut resp = HttpResponse::new(200, "");
        resp.headers
            .push(("Content-Type".into(), "application/json".into()));
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.header("x-missing"), None);
    }

    #[test]
    fn json_body() {
        let resp = HttpResponse::new(200, r#"{"threads":[1,2]}"#);
        let value: Value = resp.json().unwrap();
        assert_eq!(value["threads"][1], 2);
    }
}
