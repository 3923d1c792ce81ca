//! HS256 session tokens.
//!
//! Access and refresh tokens share one claim set and differ only in `typ` and
//! lifetime. A token presented where the other kind is expected is rejected as
//! malformed, so a stolen access token can never be exchanged for a new pair.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::Role;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token lifetime out of range")]
    TtlOutOfRange,
    #[error("failed to encode token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub jti: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens with one symmetric secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a token of `kind` for a user, valid for `ttl` from now.
    ///
    /// # Errors
    /// [`TokenError::TtlOutOfRange`] if `now + ttl` is not a representable
    /// timestamp, [`TokenError::Encode`] if signing fails.
    pub fn issue(
        &self,
        kind: TokenKind,
        user_id: Uuid,
        role: Role,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or(TokenError::TtlOutOfRange)?;
        let claims = Claims {
            jti: Uuid::new_v4(),
            user_id,
            role,
            typ: kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    /// Verify signature, structure, kind and expiry.
    ///
    /// # Errors
    /// [`TokenError::Expired`] when `exp` is in the past, [`TokenError::Malformed`]
    /// for anything else.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        self.decode(token, kind, true)
    }

    /// Same as [`TokenCodec::verify`] but accepts expired tokens.
    ///
    /// # Errors
    /// [`TokenError::Malformed`] for bad signatures, corrupt tokens or the wrong kind.
    pub fn verify_ignoring_expiry(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        self.decode(token, kind, false)
    }

    fn decode(&self, token: &str, kind: TokenKind, check_exp: bool) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_exp;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.typ != kind {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn codec() -> TokenCodec {
        TokenCodec::new(&SecretString::from("0123456789abcdef0123456789abcdef"))
    }

    #[test]
    fn issue_then_verify() -> Result<()> {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let issued = codec.issue(TokenKind::Access, user_id, Role::Reviewer, Duration::seconds(60))?;
        let claims = codec.verify(&issued.token, TokenKind::Access)?;
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, Role::Reviewer);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 60);
        Ok(())
    }

    #[test]
    fn each_issue_gets_fresh_jti() -> Result<()> {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let first = codec.issue(TokenKind::Refresh, user_id, Role::Guest, Duration::seconds(60))?;
        let second = codec.issue(TokenKind::Refresh, user_id, Role::Guest, Duration::seconds(60))?;
        assert_ne!(first.jti, second.jti);
        Ok(())
    }

    #[test]
    fn expired_token_is_reported_as_expired() -> Result<()> {
        let codec = codec();
        let issued = codec.issue(
            TokenKind::Refresh,
            Uuid::new_v4(),
            Role::Colleague,
            Duration::seconds(-10),
        )?;
        assert!(matches!(
            codec.verify(&issued.token, TokenKind::Refresh),
            Err(TokenError::Expired)
        ));
        let claims = codec.verify_ignoring_expiry(&issued.token, TokenKind::Refresh)?;
        assert_eq!(claims.jti, issued.jti);
        Ok(())
    }

    #[test]
    fn wrong_kind_is_malformed() -> Result<()> {
        let codec = codec();
        let issued = codec.issue(TokenKind::Access, Uuid::new_v4(), Role::Guest, Duration::seconds(60))?;
        assert!(matches!(
            codec.verify(&issued.token, TokenKind::Refresh),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            codec.verify_ignoring_expiry(&issued.token, TokenKind::Refresh),
            Err(TokenError::Malformed)
        ));
        Ok(())
    }

    #[test]
    fn foreign_signature_is_malformed() -> Result<()> {
        let other = TokenCodec::new(&SecretString::from("another-secret-another-secret-xx"));
        let issued = other.issue(TokenKind::Access, Uuid::new_v4(), Role::Guest, Duration::seconds(60))?;
        assert!(matches!(
            codec().verify(&issued.token, TokenKind::Access),
            Err(TokenError::Malformed)
        ));
        Ok(())
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        assert!(matches!(
            codec.verify("not.a.jwt", TokenKind::Access),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            codec.verify("", TokenKind::Access),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn unrepresentable_ttl_is_an_error() {
        let codec = codec();
        assert!(matches!(
            codec.issue(
                TokenKind::Refresh,
                Uuid::new_v4(),
                Role::Colleague,
                Duration::seconds(9_000_000_000_000),
            ),
            Err(TokenError::TtlOutOfRange)
        ));
        assert!(matches!(
            codec.issue(TokenKind::Access, Uuid::new_v4(), Role::Colleague, Duration::MAX),
            Err(TokenError::TtlOutOfRange)
        ));
    }

    #[test]
    fn debug_hides_keys() {
        assert_eq!(format!("{:?}", codec()), "TokenCodec { .. }");
    }
}
