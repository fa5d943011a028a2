//! Token claims and token pair types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `typ` claim of access tokens.
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// `typ` claim of refresh tokens.
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

// == Roles ==
/// Account role carried in access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Contractor,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Client => "client",
            Role::Contractor => "contractor",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

// == Identity ==
/// Who a session is issued for. Produced by login/registration, which live
/// outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    /// Creates a new identity.
    ///
    /// # Arguments
    /// * `subject` - Stable user id, becomes the `sub` claim
    /// * `email` - Account email carried in access tokens
    /// * `role` - Account role
    pub fn new(subject: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
            role,
        }
    }
}

// == Claims ==
/// Claims of a short-lived access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Unique token id
    pub jti: String,
    /// Always [`ACCESS_TOKEN_TYPE`]
    pub typ: String,
}

impl AccessClaims {
    pub fn identity(&self) -> Identity {
        Identity::new(self.sub.clone(), self.email.clone(), self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Claims of a long-lived, single-use refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    /// Rotation family; every token minted from one login shares it
    pub family: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    /// Always [`REFRESH_TOKEN_TYPE`]
    pub typ: String,
}

// == Token Pair ==
/// Access/refresh pair as exchanged over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry, unix seconds
    #[serde(default)]
    pub access_expires_at: i64,
    /// Refresh token expiry, unix seconds
    #[serde(default)]
    pub refresh_expires_at: i64,
}

/// A freshly minted pair together with the claims that went into it.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub pair: TokenPair,
    pub access: AccessClaims,
    pub refresh: RefreshClaims,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pair_uses_camel_case() {
        let pair = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
            access_expires_at: 1,
            refresh_expires_at: 2,
        };

        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
    }

    #[test]
    fn test_token_pair_expiry_fields_optional() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r"}"#).unwrap();
        assert_eq!(pair.access_expires_at, 0);
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Contractor).unwrap(), r#""contractor""#);
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}
