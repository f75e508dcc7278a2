//! User record and identity-provider profile.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;

/// A user known to the credential store.
///
/// The token engine only reads `id`, `email` and `is_blocked`. The remaining
/// fields are maintained by the login flow and returned by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier for the user.
    pub id: Uuid,

    /// Email address, unique per user.
    pub email: String,

    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Avatar URL from the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,

    /// Subject identifier at the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Blocked users cannot authenticate or rotate credentials.
    pub is_blocked: bool,

    /// When the user was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the user was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    /// When the user last signed in through the identity provider.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_login_at: Option<OffsetDateTime>,
}

impl User {
    /// Creates a new, unblocked user from an identity-provider profile.
    #[must_use]
    pub fn from_profile(profile: &IdentityProfile) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            picture_url: profile.picture_url.clone(),
            provider_id: Some(profile.provider_id.clone()),
            is_blocked: false,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Returns the display name, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

/// Profile returned by an identity provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    /// Verified email address.
    pub email: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Avatar URL.
    pub picture_url: Option<String>,
    /// Subject identifier at the provider.
    pub provider_id: String,
}

/// Self-service profile changes. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfile {
    /// New given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// New family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// New avatar URL. Must be an absolute `http` or `https` URL.
    #[serde(default)]
    pub picture_url: Option<String>,
}

impl UpdateProfile {
    /// Returns `true` if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.picture_url.is_none()
    }

    /// Checks the field formats.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if `picture_url` is not an http(s) URL.
    pub fn validate(&self) -> AuthResult<()> {
        if let Some(picture_url) = &self.picture_url {
            let parsed = url::Url::parse(picture_url)
                .map_err(|_| AuthError::invalid_request("pictureUrl must be a valid URL"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AuthError::invalid_request(
                    "pictureUrl must use http or https",
                ));
            }
        }
        Ok(())
    }

    /// Applies the changes to `user`, stamping `updated_at`.
    pub fn apply_to(&self, user: &mut User, at: OffsetDateTime) {
        if let Some(first_name) = &self.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(picture_url) = &self.picture_url {
            user.picture_url = Some(picture_url.clone());
        }
        user.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> IdentityProfile {
        IdentityProfile {
            email: "ada@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            picture_url: None,
            provider_id: "google-123".to_string(),
        }
    }

    #[test]
    fn test_from_profile() {
        let user = User::from_profile(&profile());
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.provider_id.as_deref(), Some("google-123"));
        assert!(!user.is_blocked);
        assert!(user.last_login_at.is_none());
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_serializes_camel_case() {
        let user = User::from_profile(&profile());
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["isBlocked"], false);
        assert!(json.get("pictureUrl").is_none());
    }

    #[test]
    fn test_update_profile_applies_only_present_fields() {
        let mut user = User::from_profile(&profile());
        let at = user.updated_at + time::Duration::minutes(1);
        let update = UpdateProfile {
            last_name: Some("Byron".to_string()),
            ..UpdateProfile::default()
        };

        update.apply_to(&mut user, at);

        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name.as_deref(), Some("Byron"));
        assert_eq!(user.updated_at, at);
    }

    #[test]
    fn test_update_profile_validation() {
        let ok = UpdateProfile {
            picture_url: Some("https://example.com/ada.png".to_string()),
            ..UpdateProfile::default()
        };
        assert!(ok.validate().is_ok());

        for bad in ["not a url", "javascript:alert(1)", "/relative.png"] {
            let update = UpdateProfile {
                picture_url: Some(bad.to_string()),
                ..UpdateProfile::default()
            };
            assert!(
                matches!(update.validate(), Err(AuthError::InvalidRequest { .. })),
                "{bad} should be rejected"
            );
        }

        assert!(UpdateProfile::default().is_empty());
        let unknown = serde_json::from_str::<UpdateProfile>(r#"{"isBlocked": false}"#);
        assert!(unknown.is_err());
    }
}
