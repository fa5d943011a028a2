//! Auth Service
//!
//! Session lifecycle on the server: start a session, rotate refresh tokens,
//! log out and suspend subjects.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::claims::{AccessClaims, Identity, TokenPair};
use crate::auth::issuer::{decode_unverified, TokenError, TokenIssuer};
use crate::auth::store::{ConsumeOutcome, RefreshRecord, RefreshTokenStore};
use crate::error::{ApiError, Result};

// == Auth Service ==
/// Server-side session lifecycle over a token issuer and a refresh store.
pub struct AuthService {
    issuer: TokenIssuer,
    store: Arc<dyn RefreshTokenStore>,
}

impl AuthService {
    /// Creates the service.
    ///
    /// # Arguments
    /// * `issuer` - Signs and verifies both token kinds
    /// * `store` - Server-side record of issued refresh tokens
    pub fn new(issuer: TokenIssuer, store: Arc<dyn RefreshTokenStore>) -> Self {
        Self { issuer, store }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    // == Start Session ==
    /// Issues the first pair of a new session (login / registration).
    pub async fn start_session(&self, identity: &Identity) -> Result<TokenPair> {
        let issued = self.issuer.issue(identity)?;
        self.store
            .save(RefreshRecord::new(&issued.refresh, identity))
            .await?;

        info!(subject = %identity.subject, family = %issued.refresh.family, "session started");
        Ok(issued.pair)
    }

    // == Authenticate ==
    /// Verifies a bearer access token.
    pub fn authenticate(&self, access_token: &str) -> Result<AccessClaims> {
        Ok(self.issuer.verify_access(access_token)?)
    }

    // == Refresh ==
    /// Exchanges a refresh token for a new pair, consuming the old token.
    ///
    /// Any failure here is terminal for the session: the caller must log in again.
    /// Presenting an already-consumed token revokes its whole family.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.issuer.verify_refresh(refresh_token).map_err(|e| match e {
            TokenError::Expired => ApiError::RefreshExhausted("refresh token expired".into()),
            TokenError::Invalid(reason) => ApiError::RefreshExhausted(reason),
            TokenError::Signing(reason) => ApiError::Internal(reason),
        })?;

        let record = match self.store.consume(&claims.jti, Utc::now()).await? {
            ConsumeOutcome::Consumed(record) => record,
            ConsumeOutcome::Reused(record) => {
                let revoked = self.store.revoke_family(&record.family).await?;
                warn!(
                    subject = %record.subject,
                    family = %record.family,
                    revoked,
                    "refresh token replayed, family revoked"
                );
                return Err(ApiError::RefreshExhausted(
                    "refresh token already used".into(),
                ));
            }
            ConsumeOutcome::Revoked => {
                return Err(ApiError::RefreshExhausted("refresh token revoked".into()))
            }
            ConsumeOutcome::Expired => {
                return Err(ApiError::RefreshExhausted("refresh token expired".into()))
            }
            ConsumeOutcome::Unknown => {
                return Err(ApiError::RefreshExhausted("unknown refresh token".into()))
            }
        };

        let identity = record.identity();
        let issued = self.issuer.issue_in_family(&identity, &record.family)?;
        self.store
            .save(RefreshRecord::new(&issued.refresh, &identity))
            .await?;

        info!(subject = %record.subject, family = %record.family, "refresh token rotated");
        Ok(issued.pair)
    }

    // == Logout ==
    /// Revokes the presented refresh token's family, or every token of the
    /// subject when none is given.
    ///
    /// # Arguments
    /// * `subject` - Caller, from the verified access token
    /// * `refresh_token` - Session to end; `None` ends all of them
    pub async fn logout(&self, subject: &str, refresh_token: Option<&str>) -> Result<usize> {
        let revoked = match refresh_token {
            Some(token) => {
                // The payload only locates the record; the stored record is authoritative
                let payload = decode_unverified(token)
                    .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
                let jti = payload
                    .get("jti")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ApiError::InvalidRequest("refresh token has no id".into()))?;

                match self.store.find(jti).await? {
                    Some(record) if record.subject == subject => {
                        self.store.revoke_family(&record.family).await?
                    }
                    _ => {
                        return Err(ApiError::InvalidRequest(
                            "refresh token does not belong to caller".into(),
                        ))
                    }
                }
            }
            None => self.store.revoke_subject(subject).await?,
        };

        info!(subject, revoked, "session logged out");
        Ok(revoked)
    }

    // == Suspend ==
    /// Administrative kill switch: revokes every refresh token of `subject`.
    pub async fn suspend(&self, subject: &str) -> Result<usize> {
        let revoked = self.store.revoke_subject(subject).await?;
        warn!(subject, revoked, "subject suspended");
        Ok(revoked)
    }

    /// Drops expired refresh records.
    pub async fn purge_expired(&self) -> Result<usize> {
        Ok(self.store.purge_expired(Utc::now()).await?)
    }
}
