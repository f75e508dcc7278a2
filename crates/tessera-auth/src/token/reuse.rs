//! Replay detection and account lockout.
//!
//! A revoked refresh token can only be presented by someone who kept a copy
//! after it was rotated or signed out, so every presentation counts. Once the
//! count reaches the threshold the owner is blocked and all of the owner's
//! active refresh tokens are revoked.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::audit::AuditLog;
use crate::storage::CredentialStore;
use crate::types::{RefreshToken, RevocationReason};

/// What the guard did about one replayed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReuseVerdict {
    /// The post-increment count, if the increment succeeded.
    pub reused_count: Option<u32>,
    /// Whether this presentation blocked the owner.
    pub blocked: bool,
}

/// Reacts to presentations of revoked refresh tokens.
pub struct ReuseGuard {
    store: Arc<dyn CredentialStore>,
    threshold: u32,
    audit: AuditLog,
}

impl ReuseGuard {
    /// Creates a guard that blocks the owner after `threshold` replays.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, threshold: u32, audit: AuditLog) -> Self {
        Self {
            store,
            threshold,
            audit,
        }
    }

    /// Returns the configured threshold.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Records a replay of `token`.
    ///
    /// Store failures are written to the audit channel and otherwise
    /// swallowed; the caller always rejects the attempt as reuse.
    pub async fn record(&self, token: &RefreshToken) -> ReuseVerdict {
        let reused_count = match self.store.increment_reuse_count(&token.token_hash).await {
            Ok(count) => count,
            Err(e) => {
                self.audit.write_failed("increment_reuse_count", token.user_id, &e);
                None
            }
        };

        self.audit
            .refresh_token_reused(token.user_id, token.id, reused_count);

        let blocked = match reused_count {
            Some(count) if count >= self.threshold => {
                self.block_owner(token, count).await;
                true
            }
            _ => false,
        };

        ReuseVerdict {
            reused_count,
            blocked,
        }
    }

    async fn block_owner(&self, token: &RefreshToken, count: u32) {
        if let Err(e) = self.store.mark_user_blocked(token.user_id).await {
            self.audit.write_failed("mark_user_blocked", token.user_id, &e);
        }

        let revoked = match self
            .store
            .revoke_user_refresh_tokens(
                token.user_id,
                RevocationReason::ReuseDetected,
                OffsetDateTime::now_utc(),
            )
            .await
        {
            Ok(revoked) => revoked,
            Err(e) => {
                self.audit
                    .write_failed("revoke_user_refresh_tokens", token.user_id, &e);
                0
            }
        };

        self.audit.account_blocked(token.user_id, count, revoked);
    }
}
