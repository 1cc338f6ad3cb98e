//! Password reset tokens: issue a single-use, time-limited secret and redeem it once.

pub mod memory;
pub mod store;
pub mod token;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::ResetConfig;
use crate::models::{PasswordResetToken, User};

pub use store::{Clock, StoreError, SystemClock, TokenStore, UserDirectory};

/// Session key remembering the secret between the link click and the form submission.
pub const SESSION_RESET_TOKEN_KEY: &str = "reset_token";

#[derive(Debug, Error)]
pub enum ResetError {
    /// Unknown secret. Also what a consumed secret looks like, since consumption deletes it.
    #[error("reset token is invalid")]
    Invalid,
    #[error("reset token has expired")]
    Expired,
    #[error("passwords do not match")]
    Mismatch,
    #[error("no account is registered for that email")]
    UnknownAccount,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ResetPolicy {
    pub ttl: Duration,
    /// Delete a user's outstanding tokens whenever a new one is issued.
    pub revoke_previous: bool,
}

impl From<&ResetConfig> for ResetPolicy {
    fn from(config: &ResetConfig) -> Self {
        Self {
            ttl: config.ttl,
            revoke_previous: config.revoke_previous,
        }
    }
}

pub struct IssuedToken {
    /// Raw bearer secret for the emailed link. Never persisted.
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone)]
pub struct ResetTokenService {
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    policy: ResetPolicy,
}

impl ResetTokenService {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        policy: ResetPolicy,
    ) -> Self {
        Self {
            tokens,
            users,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &ResetPolicy {
        &self.policy
    }

    /// Create a token for `user` and hand back the raw secret for the link.
    pub async fn issue(&self, user: &User) -> Result<IssuedToken, ResetError> {
        let secret = token::generate_secret();
        let digest = token::digest(&secret);
        let expires_at = self.clock.now() + self.policy.ttl;

        if self.policy.revoke_previous {
            let (_, revoked) = self
                .tokens
                .replace_for_user(user.id, &digest, expires_at)
                .await?;
            if revoked > 0 {
                tracing::info!(user_id = %user.id, revoked, "Revoked outstanding reset tokens");
            }
        } else {
            self.tokens.create(user.id, &digest, expires_at).await?;
        }

        tracing::info!(user_id = %user.id, %expires_at, "Password reset token issued");

        Ok(IssuedToken { secret, expires_at })
    }

    pub async fn issue_for_email(&self, email: &str) -> Result<(User, IssuedToken), ResetError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(ResetError::UnknownAccount)?;
        let issued = self.issue(&user).await?;
        Ok((user, issued))
    }

    /// Resolve a secret to its owner without spending it.
    pub async fn validate(&self, secret: &str) -> Result<User, ResetError> {
        let record = self.live_record(secret).await?;
        self.owner_of(&record).await
    }

    /// Spend a secret and set the owner's new password.
    pub async fn consume(
        &self,
        secret: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, ResetError> {
        if password != confirmation {
            return Err(ResetError::Mismatch);
        }

        let record = self.live_record(secret).await?;

        // Whoever loses the delete race sees the same thing as a replay.
        if !self.tokens.delete(record.id).await? {
            return Err(ResetError::Invalid);
        }

        let user = self.owner_of(&record).await?;
        self.users.set_password(user.id, password).await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(user)
    }

    async fn live_record(&self, secret: &str) -> Result<PasswordResetToken, ResetError> {
        let record = self
            .tokens
            .find_by_hash(&token::digest(secret))
            .await?
            .ok_or(ResetError::Invalid)?;

        if record.is_expired_at(self.clock.now()) {
            self.tokens.delete(record.id).await?;
            tracing::info!(user_id = %record.user_id, "Expired reset token reclaimed");
            return Err(ResetError::Expired);
        }

        Ok(record)
    }

    async fn owner_of(&self, record: &PasswordResetToken) -> Result<User, ResetError> {
        self.users
            .find_by_id(record.user_id)
            .await?
            .ok_or(ResetError::Invalid)
    }
}

/// `<base-url>/reset/<secret>/`
pub fn reset_link(base_url: &str, secret: &str) -> String {
    format!("{}/reset/{secret}/", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::memory::{ManualClock, MemoryTokenStore, MemoryUserDirectory};
    use super::*;
    use crate::auth::password;

    struct Harness {
        service: ResetTokenService,
        tokens: Arc<MemoryTokenStore>,
        users: Arc<MemoryUserDirectory>,
        clock: Arc<ManualClock>,
        alice: User,
    }

    fn harness(revoke_previous: bool) -> Harness {
        let tokens = Arc::new(MemoryTokenStore::new());
        let users = Arc::new(MemoryUserDirectory::new());
        let clock = Arc::new(ManualClock::default());
        let alice = users
            .insert("alice", "alice@example.com", "OldPass99")
            .unwrap();
        let service = ResetTokenService::new(
            tokens.clone(),
            users.clone(),
            clock.clone(),
            ResetPolicy {
                ttl: Duration::hours(1),
                revoke_previous,
            },
        );
        Harness {
            service,
            tokens,
            users,
            clock,
            alice,
        }
    }

    #[tokio::test]
    async fn validate_right_after_issue_returns_owner() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();

        let owner = h.service.validate(&issued.secret).await.unwrap();
        assert_eq!(owner.id, h.alice.id);
        // validation does not spend the token
        assert_eq!(h.tokens.len(), 1);
        assert!(h.service.validate(&issued.secret).await.is_ok());
    }

    #[tokio::test]
    async fn stored_value_is_digest_not_secret() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();

        let digests = h.tokens.digests();
        assert_eq!(digests, vec![token::digest(&issued.secret)]);
        assert!(!digests.contains(&issued.secret));
    }

    #[tokio::test]
    async fn issue_for_unknown_email_is_reported() {
        let h = harness(true);
        let result = h.service.issue_for_email("nobody@example.com").await;
        assert!(matches!(result, Err(ResetError::UnknownAccount)));
        assert!(h.tokens.is_empty());
    }

    #[tokio::test]
    async fn issue_for_email_resolves_user() {
        let h = harness(true);
        let (user, issued) = h
            .service
            .issue_for_email("alice@example.com")
            .await
            .unwrap();
        assert_eq!(user.id, h.alice.id);
        assert_eq!(h.service.validate(&issued.secret).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn expired_token_is_reclaimed_then_invalid() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();

        h.clock.advance(Duration::hours(1) + Duration::seconds(1));

        assert!(matches!(
            h.service.validate(&issued.secret).await,
            Err(ResetError::Expired)
        ));
        assert!(h.tokens.is_empty());
        assert!(matches!(
            h.service.validate(&issued.secret).await,
            Err(ResetError::Invalid)
        ));
    }

    #[tokio::test]
    async fn token_is_dead_exactly_at_expiry() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();

        h.clock.advance(Duration::hours(1) - Duration::seconds(1));
        assert!(h.service.validate(&issued.secret).await.is_ok());

        h.clock.advance(Duration::seconds(1));
        assert!(matches!(
            h.service.validate(&issued.secret).await,
            Err(ResetError::Expired)
        ));
    }

    #[tokio::test]
    async fn consume_sets_password_and_cannot_be_replayed() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();

        let user = h
            .service
            .consume(&issued.secret, "NewPass1", "NewPass1")
            .await
            .unwrap();
        assert_eq!(user.id, h.alice.id);

        let stored = h.users.get(h.alice.id).unwrap();
        assert!(password::verify("NewPass1", &stored.password_hash).unwrap());
        assert!(!password::verify("OldPass99", &stored.password_hash).unwrap());

        assert!(matches!(
            h.service.consume(&issued.secret, "NewPass1", "NewPass1").await,
            Err(ResetError::Invalid)
        ));
        assert!(matches!(
            h.service.validate(&issued.secret).await,
            Err(ResetError::Invalid)
        ));
    }

    #[tokio::test]
    async fn mismatch_leaves_token_usable() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();

        assert!(matches!(
            h.service.consume(&issued.secret, "NewPass1", "NewPass2").await,
            Err(ResetError::Mismatch)
        ));
        assert_eq!(h.tokens.len(), 1);
        let stored = h.users.get(h.alice.id).unwrap();
        assert!(password::verify("OldPass99", &stored.password_hash).unwrap());

        assert!(
            h.service
                .consume(&issued.secret, "NewPass1", "NewPass1")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn consume_after_expiry_is_rejected_and_reclaims() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();
        h.service.validate(&issued.secret).await.unwrap();

        h.clock.advance(Duration::hours(2));

        assert!(matches!(
            h.service.consume(&issued.secret, "NewPass1", "NewPass1").await,
            Err(ResetError::Expired)
        ));
        assert!(h.tokens.is_empty());
        let stored = h.users.get(h.alice.id).unwrap();
        assert!(password::verify("OldPass99", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn distinct_secrets_do_not_cross_validate() {
        let h = harness(false);
        let bob = h.users.insert("bob", "bob@example.com", "BobPass99").unwrap();

        let for_alice = h.service.issue(&h.alice).await.unwrap();
        let for_bob = h.service.issue(&bob).await.unwrap();

        assert_ne!(for_alice.secret, for_bob.secret);
        assert_ne!(
            token::digest(&for_alice.secret),
            token::digest(&for_bob.secret)
        );
        assert_eq!(h.service.validate(&for_alice.secret).await.unwrap().id, h.alice.id);
        assert_eq!(h.service.validate(&for_bob.secret).await.unwrap().id, bob.id);

        h.service
            .consume(&for_alice.secret, "NewPass1", "NewPass1")
            .await
            .unwrap();
        assert_eq!(h.service.validate(&for_bob.secret).await.unwrap().id, bob.id);
    }

    #[tokio::test]
    async fn reissue_revokes_previous_tokens() {
        let h = harness(true);
        let first = h.service.issue(&h.alice).await.unwrap();
        let second = h.service.issue(&h.alice).await.unwrap();

        assert_eq!(h.tokens.len(), 1);
        assert!(matches!(
            h.service.validate(&first.secret).await,
            Err(ResetError::Invalid)
        ));
        assert!(h.service.validate(&second.secret).await.is_ok());
    }

    #[tokio::test]
    async fn reissue_keeps_previous_tokens_when_revocation_disabled() {
        let h = harness(false);
        let first = h.service.issue(&h.alice).await.unwrap();
        let second = h.service.issue(&h.alice).await.unwrap();

        assert_eq!(h.tokens.len(), 2);
        assert!(h.service.validate(&first.secret).await.is_ok());
        assert!(h.service.validate(&second.secret).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reissue_leaves_one_live_token() {
        let h = harness(true);

        for _ in 0..20 {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let service = h.service.clone();
                    tokio::spawn(async move { service.issue_for_email("alice@example.com").await })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
            assert_eq!(h.tokens.len(), 1);
        }
    }

    #[tokio::test]
    async fn concurrent_consumption_succeeds_once() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();

        let (a, b) = tokio::join!(
            h.service.consume(&issued.secret, "NewPass1", "NewPass1"),
            h.service.consume(&issued.secret, "NewPass2", "NewPass2"),
        );

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        assert!(h.tokens.is_empty());
    }

    #[tokio::test]
    async fn token_of_deleted_user_is_invalid() {
        let h = harness(true);
        let issued = h.service.issue(&h.alice).await.unwrap();
        h.users.remove(h.alice.id);

        assert!(matches!(
            h.service.validate(&issued.secret).await,
            Err(ResetError::Invalid)
        ));
    }

    #[tokio::test]
    async fn garbage_secret_is_invalid() {
        let h = harness(true);
        h.service.issue(&h.alice).await.unwrap();
        assert!(matches!(
            h.service.validate("not-a-real-secret").await,
            Err(ResetError::Invalid)
        ));
    }

    #[test]
    fn reset_link_embeds_secret_as_path_segment() {
        assert_eq!(
            reset_link("https://shop.example.com/", "abc123"),
            "https://shop.example.com/reset/abc123/"
        );
        assert_eq!(
            reset_link("http://localhost:3000", "abc123"),
            "http://localhost:3000/reset/abc123/"
        );
    }

    #[test]
    fn issued_token_debug_hides_secret() {
        let issued = IssuedToken {
            secret: "super-secret".to_string(),
            expires_at: Utc::now(),
        };
        assert!(!format!("{issued:?}").contains("super-secret"));
    }
}
