//! Bearer token providers
//!
//! The fetch client only needs `get_token()`. Where the token comes from is up
//! to the provider: a fixed string from configuration, or an OAuth2
//! client-credentials exchange against a token endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

/// Tokens are refreshed this long before the server says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Source of bearer tokens for authorized requests
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self) -> HarnessResult<String>;
}

/// Authorization section of the harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Requests go out without an Authorization header
    #[default]
    None,

    /// A fixed bearer token
    Static { token: String },

    /// OAuth2 client-credentials grant
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        #[serde(default)]
        scope: Option<String>,
    },
}

impl AuthConfig {
    /// Build the provider for this configuration, if any
    pub fn provider(&self) -> Option<Arc<dyn TokenProvider>> {
        match self {
            AuthConfig::None => None,
            AuthConfig::Static { token } => Some(Arc::new(StaticToken::new(token.clone()))),
            AuthConfig::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                scope,
            } => Some(Arc::new(ClientCredentials::new(
                token_url.clone(),
                client_id.clone(),
                client_secret.clone(),
                scope.clone(),
            ))),
        }
    }
}

/// Always hands out the same token
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn get_token(&self) -> HarnessResult<String> {
        if self.token.is_empty() {
            return Err(HarnessError::Token("configured token is empty".into()));
        }
        Ok(self.token.clone())
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.refresh_at.map(|t| Instant::now() < t).unwrap_or(true)
    }
}

/// OAuth2 client-credentials provider with an in-memory token cache
pub struct ClientCredentials {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    http_client: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl ClientCredentials {
    pub fn new(
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
    ) -> Self {
        Self {
            token_url,
            client_id,
            client_secret,
            scope,
            http_client: reqwest::Client::new(),
            cached: RwLock::new(None),
        }
    }

    fn form_body(&self) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("grant_type", "client_credentials");
        form.append_pair("client_id", &self.client_id);
        form.append_pair("client_secret", &self.client_secret);
        if let Some(scope) = &self.scope {
            form.append_pair("scope", scope);
        }
        form.finish()
    }

    async fn fetch(&self) -> HarnessResult<CachedToken> {
        let resp = self
            .http_client
            .post(&self.token_url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(self.form_body())
            .send()
            .await
            .map_err(|e| HarnessError::Token(format!("token request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(HarnessError::Token(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let tokens: TokenResponse = resp
            .json()
            .await
            .map_err(|e| HarnessError::Token(format!("token response parse failed: {}", e)))?;

        if let Some(kind) = &tokens.token_type {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(HarnessError::Token(format!(
                    "unsupported token type '{}'",
                    kind
                )));
            }
        }

        let refresh_at = tokens.expires_in.map(|secs| {
            Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN)
        });
        debug!(expires_in = ?tokens.expires_in, "Obtained access token");

        Ok(CachedToken {
            value: tokens.access_token,
            refresh_at,
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentials {
    async fn get_token(&self) -> HarnessResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *self.cached.write().await = Some(token);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("abc");
        assert_eq!(provider.get_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_empty_static_token_fails() {
        let provider = StaticToken::new("");
        assert!(matches!(
            provider.get_token().await,
            Err(HarnessError::Token(_))
        ));
    }

    #[test]
    fn test_form_body_encoding() {
        let provider = ClientCredentials::new(
            "http://localhost/token".into(),
            "harness".into(),
            "s3cr3t&x".into(),
            Some("system/*.read".into()),
        );
        let body = provider.form_body();
        assert!(body.starts_with("grant_type=client_credentials"));
        assert!(body.contains("client_secret=s3cr3t%26x"));
        assert!(body.contains("scope=system%2F*.read"));
    }

    #[test]
    fn test_expired_token_is_not_fresh() {
        let token = CachedToken {
            value: "t".into(),
            refresh_at: Some(Instant::now() - Duration::from_secs(1)),
        };
        assert!(!token.is_fresh());

        let forever = CachedToken {
            value: "t".into(),
            refresh_at: None,
        };
        assert!(forever.is_fresh());
    }

    #[test]
    fn test_provider_selection() {
        assert!(AuthConfig::None.provider().is_none());
        assert!(AuthConfig::Static { token: "x".into() }.provider().is_some());
    }
}
