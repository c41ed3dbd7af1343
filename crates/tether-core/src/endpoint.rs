//! Channel endpoints.
//!
//! An [`Endpoint`] pairs the page origin (`https://host`) with a path
//! template such as `/api/v1/ws/threads/{id}` and an optional parameter.
//! Resolution mirrors the origin scheme (`http` → `ws`, `https` → `wss`)
//! and appends a `token` query parameter when one is supplied.

use url::Url;

use crate::error::EndpointError;

/// Placeholder substituted with the endpoint parameter.
pub const PARAM_PLACEHOLDER: &str = "{id}";

/// Query parameter carrying the connect token.
pub const TOKEN_QUERY_KEY: &str = "token";

/// Connection target for a channel. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    origin: Url,
    path: String,
    param: Option<String>,
}

impl Endpoint {
    /// Create an endpoint from an origin URL and a path template.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] if the origin does not parse or its scheme
    /// is not one of `http`, `https`, `ws`, `wss`.
    pub fn new(origin: &str, path: impl Into<String>) -> Result<Self, EndpointError> {
        let origin = Url::parse(origin)?;
        ws_scheme(origin.scheme())?;
        if origin.cannot_be_a_base() {
            return Err(EndpointError::CannotBeABase);
        }
        Ok(Self {
            origin,
            path: path.into(),
            param: None,
        })
    }

    /// Attach the path parameter (e.g. a thread id).
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// The path template as given.
    #[must_use]
    pub fn path_template(&self) -> &str {
        &self.path
    }

    /// The path parameter, if any.
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    /// The origin this endpoint mirrors.
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Build the WebSocket URL, appending `token` when given.
    ///
    /// The `{id}` placeholder is replaced by the parameter; a parameter on
    /// a template without a placeholder is appended as the last segment.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::MissingParam`] if the template needs a
    /// parameter that was not supplied.
    pub fn resolve(&self, token: Option<&str>) -> Result<Url, EndpointError> {
        let mut url = self.origin.clone();
        let scheme = ws_scheme(url.scheme())?;
        url.set_scheme(scheme)
            .map_err(|()| EndpointError::UnsupportedScheme(scheme.to_owned()))?;
        url.set_query(None);
        url.set_fragment(None);

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| EndpointError::CannotBeABase)?;
            segments.clear();

            let mut substituted = false;
            for segment in self.path.split('/').filter(|s| !s.is_empty()) {
                if segment == PARAM_PLACEHOLDER {
                    let param = self
                        .param
                        .as_deref()
                        .ok_or_else(|| EndpointError::MissingParam(self.path.clone()))?;
                    segments.push(param);
                    substituted = true;
                } else {
                    segments.push(segment);
                }
            }
            if !substituted && let Some(param) = &self.param {
                segments.push(param);
            }
        }

        if let Some(token) = token {
            url.query_pairs_mut().append_pair(TOKEN_QUERY_KEY, token);
        }
        Ok(url)
    }
}

fn ws_scheme(scheme: &str) -> Result<&'static str, EndpointError> {
    match scheme {
        "http" | "ws" => Ok("ws"),
        "https" | "wss" => Ok("wss"),
        other => Err(EndpointError::UnsupportedScheme(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_origin_resolves_to_wss() {
        let ep = Endpoint::new("https://host", "/api/v1/ws/discovery").unwrap();
        assert_eq!(
            ep.resolve(None).unwrap().as_str(),
            "wss://host/api/v1/ws/discovery"
        );
    }

    #[test]
    fn http_origin_resolves_to_ws_with_port() {
        let ep = Endpoint::new("http://127.0.0.1:8000", "/api/v1/ws/discovery").unwrap();
        assert_eq!(
            ep.resolve(None).unwrap().as_str(),
            "ws://127.0.0.1:8000/api/v1/ws/discovery"
        );
    }

    #[test]
    fn placeholder_is_substituted() {
        let ep = Endpoint::new("https://host", "/api/v1/ws/threads/{id}")
            .unwrap()
            .with_param("t 42");
        assert_eq!(
            ep.resolve(None).unwrap().as_str(),
            "wss://host/api/v1/ws/threads/t%2042"
        );
    }

    #[test]
    fn param_without_placeholder_is_appended() {
        let ep = Endpoint::new("https://host", "/ws/threads")
            .unwrap()
            .with_param("abc");
        assert_eq!(ep.resolve(None).unwrap().path(), "/ws/threads/abc");
    }

    #[test]
    fn missing_param_is_an_error() {
        let ep = Endpoint::new("https://host", "/ws/threads/{id}").unwrap();
        assert!(matches!(
            ep.resolve(None),
            Err(EndpointError::MissingParam(_))
        ));
    }

    #[test]
    fn token_goes_into_query() {
        let ep = Endpoint::new("https://host/?stale=1", "/ws").unwrap();
        let url = ep.resolve(Some("abc&def")).unwrap();
        assert_eq!(url.query(), Some("token=abc%26def"));
    }

    #[test]
    fn unsupported_scheme_rejected() {
        assert!(matches!(
            Endpoint::new("ftp://host", "/ws"),
            Err(EndpointError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn invalid_origin_rejected() {
        assert!(matches!(
            Endpoint::new("not a url", "/ws"),
            Err(EndpointError::InvalidOrigin(_))
        ));
    }
}
