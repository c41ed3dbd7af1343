//! Caller-supplied credentials.
//!
//! The core never inspects or stores credentials. A [`CredentialProvider`]
//! is asked for headers before every request attempt and for a query token
//! before every connect attempt, so rotated tokens are picked up without
//! rebuilding channels or request wrappers.

use std::fmt;

use async_trait::async_trait;

use crate::error::CredentialError;

/// Source of authentication material for requests and connects.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Headers to attach to the next HTTP request.
    async fn headers(&self) -> Result<Vec<(String, String)>, CredentialError>;

    /// Token to append to the next WebSocket URL, if any.
    async fn query_token(&self) -> Result<Option<String>, CredentialError> {
        Ok(None)
    }
}

/// Provider that adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn headers(&self) -> Result<Vec<(String, String)>, CredentialError> {
        Ok(Vec::new())
    }
}

/// Fixed bearer token, sent as `Authorization: Bearer <token>` and as the
/// connect query token.
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    /// Wrap a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn headers(&self) -> Result<Vec<(String, String)>, CredentialError> {
        if self.token.is_empty() {
            return Err(CredentialError::Unavailable("empty bearer token".into()));
        }
        Ok(vec![(
            "Authorization".to_owned(),
            format!("Bearer {}", self.token),
        )])
    }

    async fn query_token(&self) -> Result<Option<String>, CredentialError> {
        Ok((!self.token.is_empty()).then(|| self.token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_credentials_is_empty() {
        assert!(NoCredentials.headers().await.unwrap().is_empty());
        assert_eq!(NoCredentials.query_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn bearer_header_and_token() {
        let creds = StaticCredentials::bearer("abc");
        let headers = creds.headers().await.unwrap();
        assert_eq!(
            headers,
            vec![("Authorization".to_owned(), "Bearer abc".to_owned())]
        );
        assert_eq!(creds.query_token().await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn empty_bearer_is_unavailable() {
        let creds = StaticCredentials::bearer("");
        assert!(matches!(
            creds.headers().await,
            Err(CredentialError::Unavailable(_))
        ));
        assert_eq!(creds.query_token().await.unwrap(), None);
    }

    #[test]
    fn debug_redacts_token() {
        let creds = StaticCredentials::bearer("secret-token");
        assert!(!format!("{creds:?}").contains("secret-token"));
    }
}
