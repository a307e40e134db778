//! Client for the external authentication service.
//!
//! Access tokens are verified with `GET {url}/user`; the returned user is
//! cached per token (keyed by the token's SHA-256) for the configured TTL.
//! The login page signs in with `POST {url}/token?grant_type=password`.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::IdentityConfig;
use crate::models::AuthUser;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the identity service.
#[derive(Debug, Error, Clone)]
pub enum IdentityError {
    /// The token was rejected.
    #[error("invalid or expired access token")]
    InvalidToken,

    /// Email and password were rejected at sign-in.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// HTTP request failed.
    #[error("identity request failed: {0}")]
    Request(String),

    /// Unexpected response status.
    #[error("identity service error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be parsed.
    #[error("invalid identity response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

/// Verifies access tokens against the identity service.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    user_url: String,
    token_url: String,
    cache: Cache<String, AuthUser>,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("user_url", &self.inner.user_url)
            .finish_non_exhaustive()
    }
}

impl IdentityClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Parse` if the API key is not a valid header
    /// value, or `IdentityError::Request` if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.api_key.expose_secret())
                .map_err(|e| IdentityError::Parse(format!("invalid API key header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.cache_ttl)
            .build();

        let base = config.url.as_str().trim_end_matches('/');
        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                user_url: format!("{base}/user"),
                token_url: format!("{base}/token?grant_type=password"),
                cache,
            }),
        })
    }

    /// Resolve the user behind an access token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if the service rejects the token.
    #[instrument(skip(self, token))]
    pub async fn current_user(&self, token: &str) -> Result<AuthUser, IdentityError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(IdentityError::InvalidToken);
        }

        let key = cache_key(token);
        if let Some(user) = self.inner.cache.get(&key).await {
            return Ok(user);
        }

        let user = self.fetch_user(token).await?;
        self.inner.cache.insert(key, user.clone()).await;
        tracing::debug!(user_id = %user.id, "Access token verified");
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// The returned user is cached under the new access token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` if the service rejects
    /// the email or password.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignIn, IdentityError> {
        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .json(&PasswordGrant {
                email: email.trim(),
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(IdentityError::InvalidCredentials);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let grant: TokenResponse =
            serde_json::from_str(&body).map_err(|e| IdentityError::Parse(e.to_string()))?;
        self.inner
            .cache
            .insert(cache_key(&grant.access_token), grant.user.clone())
            .await;
        tracing::info!(user_id = %grant.user.id, "Signed in with password");

        Ok(SignIn {
            access_token: SecretString::from(grant.access_token),
            user: grant.user,
        })
    }

    /// Drop a cached token, e.g. on logout.
    pub async fn forget(&self, token: &str) {
        self.inner.cache.invalidate(&cache_key(token.trim())).await;
    }

    async fn fetch_user(&self, token: &str) -> Result<AuthUser, IdentityError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| IdentityError::InvalidToken)?;

        let response = self
            .inner
            .client
            .get(&self.inner.user_url)
            .header(AUTHORIZATION, bearer)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(IdentityError::InvalidToken);
        }
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "Identity service returned non-success status"
            );
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| IdentityError::Parse(e.to_string()))
    }
}

/// A successful password sign-in.
#[derive(Debug)]
pub struct SignIn {
    pub access_token: SecretString,
    pub user: AuthUser,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

fn cache_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use url::Url;

    use super::*;

    fn client() -> IdentityClient {
        IdentityClient::new(&IdentityConfig {
            url: Url::parse("https://auth.vitrine.test/auth/v1/").unwrap(),
            api_key: SecretString::from("anon-key-4c1e9a7f2b"),
            cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        assert_eq!(client.inner.user_url, "https://auth.vitrine.test/auth/v1/user");
        assert_eq!(
            client.inner.token_url,
            "https://auth.vitrine.test/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_token_response_parses_user() {
        let grant: TokenResponse = serde_json::from_str(
            r#"{
                "access_token": "eyJ.abc.def",
                "token_type": "bearer",
                "user": {
                    "id": "2f6d3c1e-8a4b-4f7e-9c2d-1b3a5e7f9d0c",
                    "email": "owner@shop.test",
                    "user_metadata": {"full_name": "Ada Owner"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(grant.access_token, "eyJ.abc.def");
        assert_eq!(grant.user.email.as_deref(), Some("owner@shop.test"));
    }

    #[test]
    fn test_cache_key_hides_token() {
        let key = cache_key("secret-token");
        assert_eq!(key.len(), 64);
        assert!(!key.contains("secret"));
        assert_eq!(key, cache_key("secret-token"));
    }

    #[tokio::test]
    async fn test_blank_token_is_rejected_without_request() {
        let err = client().current_user("   ").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken));
    }

    #[tokio::test]
    async fn test_cached_user_is_returned() {
        let client = client();
        let user = AuthUser {
            id: uuid::Uuid::new_v4(),
            email: Some("owner@shop.test".to_owned()),
            metadata: serde_json::Value::Null,
        };
        client
            .inner
            .cache
            .insert(cache_key("tok"), user.clone())
            .await;

        assert_eq!(client.current_user("tok").await.unwrap(), user);

        client.forget("tok").await;
        assert!(client.inner.cache.get(&cache_key("tok")).await.is_none());
    }
}
