//! Cookie transport for the token pair.
//!
//! Both cookies are `HttpOnly`, `SameSite=Strict`, `Path=/`, with `Max-Age`
//! equal to the credential lifetime. `Secure` follows [`CookieConfig::secure`].

use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::{CookieConfig, TokenSettings};
use crate::token::issuer::IssuedTokens;

/// Credentials presented with a request.
#[derive(Default)]
pub struct PresentedTokens {
    /// Access token cookie value.
    pub access_token: Option<String>,
    /// Refresh token cookie value.
    pub refresh_token: Option<String>,
}

/// Reads both credentials from the jar. Empty values count as absent.
#[must_use]
pub fn read_tokens(jar: &CookieJar, config: &CookieConfig) -> PresentedTokens {
    let value = |name: &str| {
        jar.get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    };
    PresentedTokens {
        access_token: value(&config.access_token_name),
        refresh_token: value(&config.refresh_token_name),
    }
}

fn credential_cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Adds both credential cookies to the jar.
#[must_use]
pub fn write_tokens(
    jar: CookieJar,
    config: &CookieConfig,
    settings: &TokenSettings,
    tokens: &IssuedTokens,
) -> CookieJar {
    jar.add(credential_cookie(
        &config.access_token_name,
        &tokens.access_token,
        settings.access_lifetime.duration(),
        config.secure,
    ))
    .add(credential_cookie(
        &config.refresh_token_name,
        &tokens.refresh_token,
        settings.refresh_lifetime.duration(),
        config.secure,
    ))
}

/// Expires both credential cookies.
#[must_use]
pub fn clear_tokens(jar: CookieJar, config: &CookieConfig) -> CookieJar {
    jar.add(credential_cookie(
        &config.access_token_name,
        "",
        Duration::ZERO,
        config.secure,
    ))
    .add(credential_cookie(
        &config.refresh_token_name,
        "",
        Duration::ZERO,
        config.secure,
    ))
}
