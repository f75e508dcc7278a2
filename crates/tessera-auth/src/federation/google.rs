//! Google sign-in.
//!
//! The browser obtains a one-time authorization code through Google's
//! popup flow and posts it to the callback route. The code is exchanged at
//! the token endpoint (with `redirect_uri = "postmessage"` for the popup
//! flow), and the resulting access token is used once to read the userinfo
//! endpoint.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::IdentityProvider;
use super::error::IdpError;
use crate::AuthResult;
use crate::types::IdentityProfile;

const PROVIDER: &str = "google";

/// Google OAuth client configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Redirect URI sent with the code exchange.
    pub redirect_uri: String,

    /// Token endpoint.
    pub token_endpoint: String,

    /// Userinfo endpoint.
    pub userinfo_endpoint: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "postmessage".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_endpoint: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("token_endpoint", &self.token_endpoint)
            .field("userinfo_endpoint", &self.userinfo_endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Token endpoint success response. Only the access token is used.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Userinfo endpoint response.
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl UserInfo {
    fn into_profile(self) -> Result<IdentityProfile, IdpError> {
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| IdpError::MissingField("email".to_string()))?;

        Ok(IdentityProfile {
            email,
            first_name: self.given_name,
            last_name: self.family_name,
            picture_url: self.picture,
            provider_id: self.sub,
        })
    }
}

/// [`IdentityProvider`] backed by Google's OAuth endpoints.
pub struct GoogleIdentityProvider {
    config: GoogleConfig,
    token_endpoint: Url,
    userinfo_endpoint: Url,
    http_client: reqwest::Client,
}

impl GoogleIdentityProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(config: GoogleConfig) -> Result<Self, IdpError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::with_client(config, http_client)
    }

    /// Creates a provider sharing an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not a valid URL.
    pub fn with_client(config: GoogleConfig, http_client: reqwest::Client) -> Result<Self, IdpError> {
        Ok(Self {
            token_endpoint: Url::parse(&config.token_endpoint)?,
            userinfo_endpoint: Url::parse(&config.userinfo_endpoint)?,
            config,
            http_client,
        })
    }

    async fn exchange(&self, code: &str) -> Result<TokenResponse, IdpError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        tracing::debug!(endpoint = %self.token_endpoint, "Exchanging Google authorization code");

        let response = self
            .http_client
            .post(self.token_endpoint.as_str())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(IdpError::oauth_error(
                    oauth_error.error,
                    oauth_error.error_description.unwrap_or_default(),
                ));
            }

            return Err(IdpError::TokenExchangeFailed(format!("HTTP {status}")));
        }

        response.json().await.map_err(|e| {
            IdpError::TokenExchangeFailed(format!("Failed to parse token response: {e}"))
        })
    }

    async fn userinfo(&self, access_token: &str) -> Result<UserInfo, IdpError> {
        let response = self
            .http_client
            .get(self.userinfo_endpoint.as_str())
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdpError::UserinfoFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| IdpError::UserinfoFailed(format!("Failed to parse userinfo: {e}")))
    }

    async fn fetch_profile(&self, code: &str) -> Result<IdentityProfile, IdpError> {
        let tokens = self.exchange(code).await?;
        self.userinfo(&tokens.access_token).await?.into_profile()
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<IdentityProfile> {
        self.fetch_profile(code).await.map_err(|e| {
            tracing::warn!(provider = PROVIDER, error = %e, "Identity provider exchange failed");
            e.into_auth_error(PROVIDER)
        })
    }
}
