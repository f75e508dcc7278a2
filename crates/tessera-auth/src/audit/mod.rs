//! Security audit channel.
//!
//! Audit events are ordinary `tracing` events emitted under the
//! [`AUDIT_TARGET`] target with an `event` field, so they can be routed to a
//! dedicated sink with an `EnvFilter` directive such as `tessera::audit=info`.
//! Credential values are never passed here; only record ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::error::AuthError;
use crate::types::RevocationReason;

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "tessera::audit";

/// Audit event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    /// A revoked refresh token was presented.
    RefreshTokenReused,
    /// A user was blocked after repeated reuse.
    AccountBlocked,
    /// A refresh token was exchanged for a new pair.
    TokenRotated,
    /// A new pair was issued.
    TokensIssued,
    /// A refresh token was revoked outside rotation.
    RefreshTokenRevoked,
    /// Authentication of a request failed.
    AuthenticationFailed,
    /// A store write on the security path failed.
    AuditWriteFailed,
}

impl AuditEvent {
    /// Returns the `event` field value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshTokenReused => "refresh_token_reused",
            Self::AccountBlocked => "account_blocked",
            Self::TokenRotated => "token_rotated",
            Self::TokensIssued => "tokens_issued",
            Self::RefreshTokenRevoked => "refresh_token_revoked",
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuditWriteFailed => "audit_write_failed",
        }
    }
}

/// Emits audit events according to an [`AuditConfig`].
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    config: AuditConfig,
}

impl AuditLog {
    /// Creates an audit log with the given toggles.
    #[must_use]
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Returns `true` if `event` is written under the current configuration.
    ///
    /// Write failures are always logged.
    #[must_use]
    pub fn is_enabled(&self, event: AuditEvent) -> bool {
        match event {
            AuditEvent::RefreshTokenReused | AuditEvent::AccountBlocked => {
                self.config.log_security_events
            }
            AuditEvent::TokenRotated
            | AuditEvent::TokensIssued
            | AuditEvent::RefreshTokenRevoked => self.config.log_token_operations,
            AuditEvent::AuthenticationFailed => self.config.log_failed_auth,
            AuditEvent::AuditWriteFailed => true,
        }
    }

    pub fn refresh_token_reused(&self, user_id: Uuid, token_id: Uuid, reused_count: Option<u32>) {
        let event = AuditEvent::RefreshTokenReused;
        if self.is_enabled(event) {
            tracing::warn!(
                target: AUDIT_TARGET,
                event = event.as_str(),
                %user_id,
                %token_id,
                reused_count,
                "Revoked refresh token presented"
            );
        }
    }

    pub fn account_blocked(&self, user_id: Uuid, reused_count: u32, revoked_tokens: u64) {
        let event = AuditEvent::AccountBlocked;
        if self.is_enabled(event) {
            tracing::warn!(
                target: AUDIT_TARGET,
                event = event.as_str(),
                %user_id,
                reused_count,
                revoked_tokens,
                "Account blocked after repeated refresh token reuse"
            );
        }
    }

    pub fn tokens_issued(&self, user_id: Uuid, token_id: Uuid) {
        let event = AuditEvent::TokensIssued;
        if self.is_enabled(event) {
            tracing::info!(
                target: AUDIT_TARGET,
                event = event.as_str(),
                %user_id,
                %token_id,
                "Issued token pair"
            );
        }
    }

    pub fn token_rotated(&self, user_id: Uuid, old_token_id: Uuid, new_token_id: Uuid) {
        let event = AuditEvent::TokenRotated;
        if self.is_enabled(event) {
            tracing::info!(
                target: AUDIT_TARGET,
                event = event.as_str(),
                %user_id,
                %old_token_id,
                %new_token_id,
                "Rotated refresh token"
            );
        }
    }

    pub fn refresh_token_revoked(&self, user_id: Uuid, token_id: Uuid, reason: RevocationReason) {
        let event = AuditEvent::RefreshTokenRevoked;
        if self.is_enabled(event) {
            tracing::info!(
                target: AUDIT_TARGET,
                event = event.as_str(),
                %user_id,
                %token_id,
                reason = reason.as_str(),
                "Revoked refresh token"
            );
        }
    }

    pub fn authentication_failed(&self, error: &AuthError) {
        let event = AuditEvent::AuthenticationFailed;
        if self.is_enabled(event) {
            tracing::info!(
                target: AUDIT_TARGET,
                event = event.as_str(),
                code = error.code(),
                category = %error.category(),
                "Authentication failed"
            );
        }
    }

    pub fn write_failed(&self, operation: &'static str, user_id: Uuid, error: &AuthError) {
        tracing::error!(
            target: AUDIT_TARGET,
            event = AuditEvent::AuditWriteFailed.as_str(),
            operation,
            %user_id,
            error = %error,
            "Security write failed"
        );
    }
}
