//! Refresh token storage.
//!
//! Server-side record of every issued refresh token so that rotation can
//! reject reuse and logout / suspension can cut sessions off immediately.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::auth::claims::{Identity, RefreshClaims, Role};

// == Store Error ==
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refresh token storage unavailable: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Refresh Record ==
/// Persisted state of one refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    pub jti: String,
    pub subject: String,
    pub family: String,
    /// Account snapshot carried into rotated access tokens
    pub email: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub consumed: bool,
}

impl RefreshRecord {
    /// Builds a live record for a freshly issued refresh token.
    ///
    /// # Arguments
    /// * `claims` - Claims of the issued refresh token
    /// * `identity` - Account the token was issued for
    pub fn new(claims: &RefreshClaims, identity: &Identity) -> Self {
        Self {
            jti: claims.jti.clone(),
            subject: claims.sub.clone(),
            family: claims.family.clone(),
            email: identity.email.clone(),
            role: identity.role,
            issued_at: unix_to_datetime(claims.iat),
            expires_at: unix_to_datetime(claims.exp),
            revoked: false,
            consumed: false,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.subject.clone(), self.email.clone(), self.role)
    }
}

fn unix_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// == Store Trait ==
/// Result of trying to use a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// First use; the record is now marked consumed
    Consumed(RefreshRecord),
    /// Token was already used once: a replay
    Reused(RefreshRecord),
    Revoked,
    Expired,
    Unknown,
}

/// Storage backend for refresh token records.
///
/// `consume` must check and mark the record in one atomic step so that two
/// concurrent refreshes with the same token cannot both succeed.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(&self, record: RefreshRecord) -> StoreResult<()>;

    async fn find(&self, jti: &str) -> StoreResult<Option<RefreshRecord>>;

    /// Marks a token used, reporting what state it was found in.
    ///
    /// # Arguments
    /// * `jti` - Id of the presented refresh token
    /// * `now` - Instant the expiry check is made against
    async fn consume(&self, jti: &str, now: DateTime<Utc>) -> StoreResult<ConsumeOutcome>;

    /// Revokes one token. Returns whether a live record was revoked.
    async fn revoke(&self, jti: &str) -> StoreResult<bool>;

    /// Revokes every token of a rotation family.
    async fn revoke_family(&self, family: &str) -> StoreResult<usize>;

    /// Revokes every token of a subject (logout everywhere, suspension).
    async fn revoke_subject(&self, subject: &str) -> StoreResult<usize>;

    /// Drops records past their expiry.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}

// == In-Memory Store ==
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    records: RwLock<HashMap<String, RefreshRecord>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn revoke_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&RefreshRecord) -> bool + Send,
    {
        let mut records = self.records.write().await;
        let mut revoked = 0;
        for record in records.values_mut().filter(|r| !r.revoked && predicate(r)) {
            record.revoked = true;
            revoked += 1;
        }
        revoked
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn save(&self, record: RefreshRecord) -> StoreResult<()> {
        self.records.write().await.insert(record.jti.clone(), record);
        Ok(())
    }

    async fn find(&self, jti: &str) -> StoreResult<Option<RefreshRecord>> {
        Ok(self.records.read().await.get(jti).cloned())
    }

    async fn consume(&self, jti: &str, now: DateTime<Utc>) -> StoreResult<ConsumeOutcome> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(jti) else {
            return Ok(ConsumeOutcome::Unknown);
        };

        let outcome = if record.revoked {
            ConsumeOutcome::Revoked
        } else if record.consumed {
            ConsumeOutcome::Reused(record.clone())
        } else if record.is_expired_at(now) {
            ConsumeOutcome::Expired
        } else {
            record.consumed = true;
            ConsumeOutcome::Consumed(record.clone())
        };
        Ok(outcome)
    }

    async fn revoke(&self, jti: &str) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(jti) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_family(&self, family: &str) -> StoreResult<usize> {
        Ok(self.revoke_where(|r| r.family == family).await)
    }

    async fn revoke_subject(&self, subject: &str) -> StoreResult<usize> {
        Ok(self.revoke_where(|r| r.subject == subject).await)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(jti: &str, subject: &str, family: &str) -> RefreshRecord {
        let now = Utc::now();
        RefreshRecord {
            jti: jti.to_string(),
            subject: subject.to_string(),
            family: family.to_string(),
            email: format!("{subject}@example.com"),
            role: Role::Client,
            issued_at: now,
            expires_at: now + Duration::days(7),
            revoked: false,
            consumed: false,
        }
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let store = InMemoryRefreshTokenStore::new();
        store.save(record("t1", "u1", "f1")).await.unwrap();

        let first = store.consume("t1", Utc::now()).await.unwrap();
        assert!(matches!(first, ConsumeOutcome::Consumed(_)));

        let second = store.consume("t1", Utc::now()).await.unwrap();
        assert!(matches!(second, ConsumeOutcome::Reused(_)));
    }

    #[tokio::test]
    async fn test_consume_unknown_revoked_expired() {
        let store = InMemoryRefreshTokenStore::new();
        assert_eq!(
            store.consume("missing", Utc::now()).await.unwrap(),
            ConsumeOutcome::Unknown
        );

        store.save(record("t1", "u1", "f1")).await.unwrap();
        assert!(store.revoke("t1").await.unwrap());
        assert!(!store.revoke("t1").await.unwrap());
        assert_eq!(
            store.consume("t1", Utc::now()).await.unwrap(),
            ConsumeOutcome::Revoked
        );

        store.save(record("t2", "u1", "f1")).await.unwrap();
        let later = Utc::now() + Duration::days(8);
        assert_eq!(store.consume("t2", later).await.unwrap(), ConsumeOutcome::Expired);
    }

    #[tokio::test]
    async fn test_revoke_family_and_subject() {
        let store = InMemoryRefreshTokenStore::new();
        store.save(record("a", "u1", "f1")).await.unwrap();
        store.save(record("b", "u1", "f1")).await.unwrap();
        store.save(record("c", "u1", "f2")).await.unwrap();
        store.save(record("d", "u2", "f3")).await.unwrap();

        assert_eq!(store.revoke_family("f1").await.unwrap(), 2);
        assert_eq!(store.revoke_subject("u1").await.unwrap(), 1);

        let d = store.find("d").await.unwrap().unwrap();
        assert!(!d.revoked);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryRefreshTokenStore::new();
        store.save(record("a", "u1", "f1")).await.unwrap();

        assert_eq!(store.purge_expired(Utc::now()).await.unwrap(), 0);
        assert_eq!(
            store.purge_expired(Utc::now() + Duration::days(30)).await.unwrap(),
            1
        );
        assert!(store.is_empty().await);
    }
}
