//! The resilient request wrapper.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tether_core::{
    CredentialProvider, HttpResponse, HttpTransport, Method, NoCredentials, OutboundRequest,
    RetryBackoff,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{DEFAULT_CACHE_CAPACITY, ResponseCache};
use crate::error::{AttemptError, RequestError, RequestResult};
use crate::rate_limit::MinIntervalGate;
use crate::signature::RequestSignature;
use crate::transport::ReqwestTransport;

/// Default spacing between transmissions.
pub const DEFAULT_RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(2000);

/// Tuning for a [`ResilientRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestConfig {
    /// Attempt budget and retry delays.
    pub retry: RetryBackoff,
    /// Minimum spacing between transmissions on one instance.
    pub rate_limit_interval: Duration,
    /// Cached responses kept for read-through requests.
    pub cache_capacity: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            retry: RetryBackoff::default(),
            rate_limit_interval: DEFAULT_RATE_LIMIT_INTERVAL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Whether a request may be answered from the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always transmit.
    #[default]
    None,
    /// Serve an identical earlier response if cached; cache 2xx responses.
    ReadThrough,
}

/// One request to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Method.
    pub method: Method,
    /// Absolute target URL.
    pub url: String,
    /// JSON body.
    pub body: Option<Value>,
    /// Headers sent in addition to the credential headers.
    pub headers: Vec<(String, String)>,
    /// Cache behaviour.
    pub cache: CachePolicy,
}

impl RequestDescriptor {
    /// Request with no body, extra headers or caching.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Vec::new(),
            cache: CachePolicy::None,
        }
    }

    /// `GET url`
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// `POST url` with a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the cache policy.
    #[must_use]
    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Shorthand for [`CachePolicy::ReadThrough`].
    #[must_use]
    pub fn read_through(self) -> Self {
        self.with_cache(CachePolicy::ReadThrough)
    }

    /// Signature used as the cache key.
    #[must_use]
    pub fn signature(&self) -> RequestSignature {
        RequestSignature::compute(self.method, &self.url, self.body.as_ref())
    }
}

/// Request/response calls with retry, a shared rate-limit gate and a
/// response cache.
///
/// One instance is meant to be shared by every caller talking to the same
/// API so the gate and cache apply across all of them.
pub struct ResilientRequest {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialProvider>,
    config: RequestConfig,
    gate: MinIntervalGate,
    cache: Mutex<ResponseCache>,
}

impl std::fmt::Debug for ResilientRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientRequest")
            .field("config", &self.config)
            .field("cache_len", &self.cache_len())
            .finish_non_exhaustive()
    }
}

impl ResilientRequest {
    /// Wrap `transport` with the default configuration.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_parts(transport, Arc::new(NoCredentials), RequestConfig::default())
    }

    /// Wrap a default `reqwest` client.
    #[must_use]
    pub fn http() -> Self {
        Self::new(Arc::new(ReqwestTransport::new()))
    }

    fn with_parts(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialProvider>,
        config: RequestConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            gate: MinIntervalGate::new(config.rate_limit_interval),
            cache: Mutex::new(ResponseCache::new(config.cache_capacity)),
            config,
        }
    }

    /// Replace the configuration. Resets the gate and the cache.
    #[must_use]
    pub fn with_config(self, config: RequestConfig) -> Self {
        Self::with_parts(self.transport, self.credentials, config)
    }

    /// Ask `credentials` for headers before every attempt.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Execute `descriptor`.
    ///
    /// A read-through request with a cached response returns it without
    /// transmitting. Otherwise each attempt waits for the rate-limit gate,
    /// fetches fresh credential headers, and transmits. A 2xx response ends
    /// the call; anything else is retried until the attempt budget is spent.
    ///
    /// # Errors
    ///
    /// - [`RequestError::InvalidRequest`] if the URL does not parse
    /// - [`RequestError::Credentials`] if the provider fails (not retried)
    /// - [`RequestError::Exhausted`] once every attempt has failed
    pub async fn execute(&self, descriptor: RequestDescriptor) -> RequestResult<HttpResponse> {
        Url::parse(&descriptor.url)
            .map_err(|e| RequestError::InvalidRequest(format!("{}: {e}", descriptor.url)))?;

        let signature = descriptor.signature();
        let read_through = descriptor.cache == CachePolicy::ReadThrough;

        if read_through {
            let cached = self.cache().get(&signature).cloned();
            if let Some(response) = cached {
                debug!(method = %descriptor.method, url = %descriptor.url, "Cache hit");
                return Ok(response);
            }
        }

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);

            let credential_headers = self.credentials.headers().await?;
            let request = OutboundRequest {
                method: descriptor.method,
                url: descriptor.url.clone(),
                headers: descriptor
                    .headers
                    .iter()
                    .cloned()
                    .chain(credential_headers)
                    .collect(),
                body: descriptor.body.clone(),
            };

            self.gate.pass().await;
            debug!(method = %request.method, url = %request.url, attempt, "Sending request");

            let failure = match self.transport.send(&request).await {
                Ok(response) if response.is_success() => {
                    if read_through {
                        self.cache().insert(signature, response.clone());
                    }
                    return Ok(response);
                },
                Ok(response) if response.is_rate_limited() => AttemptError::RateLimited,
                Ok(response) => AttemptError::Status {
                    status: response.status,
                    body: response.body,
                },
                Err(err) => AttemptError::Transport(err),
            };

            if !self.config.retry.has_attempts_left(attempt) {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    attempts = attempt,
                    error = %failure,
                    "Request failed; attempts exhausted"
                );
                return Err(RequestError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = match failure {
                AttemptError::RateLimited => self.config.retry.rate_limited_delay(attempt),
                _ => self.config.retry.delay(attempt),
            };
            info!(
                attempt,
                delay_ms = delay.as_millis(),
                error = %failure,
                "Request attempt failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Drop the cached response for `signature`. Returns `true` if one was
    /// cached.
    pub fn invalidate(&self, signature: &RequestSignature) -> bool {
        self.cache().remove(signature)
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    /// Number of cached responses.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
