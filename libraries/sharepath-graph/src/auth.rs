//! Access tokens for Graph.
//!
//! Static tokens are used as-is. The client-credentials flow exchanges an
//! application secret or a certificate-signed JWT assertion for a token at
//! the tenant's token endpoint and caches it until shortly before expiry.

use crate::error::{GraphError, Result};
use crate::http::{check, json};
use crate::models::TokenResponse;
use crate::settings::{decode_thumbprint, Credential, GraphSettings};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

const JWT_BEARER: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Produces bearer tokens for Graph requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A token obtained outside this crate. It is never refreshed.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

enum Secret {
    ClientSecret(String),
    Certificate { key: EncodingKey, x5t: String },
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// OAuth2 client-credentials grant against the Microsoft identity platform.
pub struct ClientCredentials {
    http: Client,
    token_url: String,
    client_id: String,
    secret: Secret,
    cached: RwLock<Option<CachedToken>>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: i64,
    exp: i64,
}

impl ClientCredentials {
    /// Client-credentials flow with an application secret.
    pub fn with_secret(
        http: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self::build(
            http,
            token_url.into(),
            client_id.into(),
            Secret::ClientSecret(secret.into()),
        )
    }

    /// Client-credentials flow with a certificate-signed assertion.
    ///
    /// `thumbprint` is the hex SHA-1 digest of the certificate; it becomes
    /// the `x5t` header Azure AD uses to pick the registered certificate.
    pub fn with_certificate(
        http: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        private_key_pem: &str,
        thumbprint: &str,
    ) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
            GraphError::Configuration(format!("invalid certificate private key: {e}"))
        })?;
        let x5t = URL_SAFE_NO_PAD.encode(decode_thumbprint(thumbprint)?);

        Ok(Self::build(
            http,
            token_url.into(),
            client_id.into(),
            Secret::Certificate { key, x5t },
        ))
    }

    fn build(http: Client, token_url: String, client_id: String, secret: Secret) -> Self {
        Self {
            http,
            token_url,
            client_id,
            secret,
            cached: RwLock::new(None),
        }
    }

    fn client_assertion(&self, key: &EncodingKey, x5t: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            aud: &self.token_url,
            iss: &self.client_id,
            sub: &self.client_id,
            jti: Uuid::new_v4().to_string(),
            nbf: now - 60,
            exp: now + 300,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.x5t = Some(x5t.to_string());
        Ok(encode(&header, &claims, key)?)
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let mut form = vec![
            ("client_id", self.client_id.clone()),
            ("scope", GRAPH_SCOPE.to_string()),
            ("grant_type", "client_credentials".to_string()),
        ];
        match &self.secret {
            Secret::ClientSecret(secret) => form.push(("client_secret", secret.clone())),
            Secret::Certificate { key, x5t } => {
                form.push(("client_assertion_type", JWT_BEARER.to_string()));
                form.push(("client_assertion", self.client_assertion(key, x5t)?));
            }
        }

        debug!(url = %self.token_url, client_id = %self.client_id, "Requesting access token");

        let response = self.http.post(&self.token_url).form(&form).send().await?;
        let response = match check(response, "token endpoint").await {
            Ok(response) => response,
            Err(GraphError::Api { status, message }) if status == 400 || status == 401 => {
                warn!(status, "Token request rejected");
                return Err(GraphError::AuthFailed(message));
            }
            Err(GraphError::Unauthorized(message)) => return Err(GraphError::AuthFailed(message)),
            Err(e) => return Err(e),
        };

        let token: TokenResponse = json(response, "token response").await?;
        let lifetime = token.expires_in.unwrap_or(3600) as i64;
        info!(expires_in = lifetime, "Obtained access token");

        Ok(CachedToken {
            token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime - EXPIRY_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentials {
    async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.token.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }
}

/// Build the provider matching the configured credential.
pub fn token_provider(settings: &GraphSettings, http: &Client) -> Result<Arc<dyn TokenProvider>> {
    Ok(match &settings.credential {
        Credential::AccessToken { token } => Arc::new(StaticToken::new(token.clone())),
        Credential::ClientSecret { secret } => Arc::new(ClientCredentials::with_secret(
            http.clone(),
            settings.token_url(),
            settings.client_id.clone(),
            secret.clone(),
        )),
        Credential::Certificate {
            private_key_pem,
            thumbprint,
        } => Arc::new(ClientCredentials::with_certificate(
            http.clone(),
            settings.token_url(),
            settings.client_id.clone(),
            private_key_pem,
            thumbprint,
        )?),
    })
}
