//! Signed bearer tokens.
//!
//! Format: `base64url(claims_json) "." base64url(hmac_sha256(secret, first_segment))`,
//! both segments unpadded. Claims carry the subject and an expiry; the
//! server keeps no token state, so logout is a client-side operation.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use bazaar_core::UserId;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Issues tokens bound to a subject and resolves them back.
pub trait TokenIssuer: Send + Sync {
    /// Issue a token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if the token cannot be produced.
    fn issue(&self, subject: &UserId) -> Result<String, AuthError>;

    /// Resolve a token to the subject it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for malformed or tampered tokens and
    /// `AuthError::TokenExpired` once the expiry has passed.
    fn resolve(&self, token: &str) -> Result<UserId, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// HMAC-SHA256 signed tokens with a fixed lifetime.
pub struct HmacTokenIssuer {
    secret: SecretString,
    ttl: Duration,
}

impl HmacTokenIssuer {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::TokenSigning)
    }

    pub(crate) fn issue_at(&self, subject: &UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.as_str().to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let json = serde_json::to_vec(&claims).map_err(|_| AuthError::TokenSigning)?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    pub(crate) fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| AuthError::InvalidToken)?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(UserId::new(claims.sub))
    }
}

impl TokenIssuer for HmacTokenIssuer {
    fn issue(&self, subject: &UserId) -> Result<String, AuthError> {
        self.issue_at(subject, Utc::now())
    }

    fn resolve(&self, token: &str) -> Result<UserId, AuthError> {
        self.resolve_at(token, Utc::now())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> HmacTokenIssuer {
        HmacTokenIssuer::new(SecretString::from(secret), Duration::minutes(30))
    }

    #[test]
    fn test_issue_then_resolve() {
        let tokens = issuer("k3y-for-tests-9f8e7d6c5b4a39281706");
        let subject = UserId::new("u-42");

        let token = tokens.issue(&subject).unwrap();
        assert_eq!(tokens.resolve(&token).unwrap(), subject);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = issuer("k3y-for-tests-9f8e7d6c5b4a39281706");
        let issued = Utc::now() - Duration::minutes(31);

        let token = tokens.issue_at(&UserId::new("u-42"), issued).unwrap();
        assert!(matches!(
            tokens.resolve(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let tokens = issuer("k3y-for-tests-9f8e7d6c5b4a39281706");
        let token = tokens.issue(&UserId::new("u-42")).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = serde_json::json!({"sub": "admin", "iat": 0, "exp": i64::MAX});
        let forged = format!(
            "{}.{signature}",
            URL_SAFE_NO_PAD.encode(forged_claims.to_string())
        );
        assert!(matches!(
            tokens.resolve(&forged),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let token = issuer("k3y-for-tests-9f8e7d6c5b4a39281706")
            .issue(&UserId::new("u-42"))
            .unwrap();
        assert!(issuer("another-key-0a1b2c3d4e5f60718293a4b5").resolve(&token).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let tokens = issuer("k3y-for-tests-9f8e7d6c5b4a39281706");
        for garbage in ["", "abc", "a.b", "....", "Bearer x"] {
            assert!(tokens.resolve(garbage).is_err(), "{garbage:?} resolved");
        }
    }
}
