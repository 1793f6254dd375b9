//! Bearer token issuing and verification.
//!
//! Tokens are compact JWS strings signed with HMAC-SHA256:
//! `base64url(header).base64url(claims).base64url(signature)`. The claims
//! carry the user id and the issue/expiry times in Unix seconds. There is no
//! refresh; a token is valid until `exp`.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use bazaar_core::UserId;

const ALGORITHM: &str = "HS256";

/// Errors from token verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token is not three base64url segments of JSON.
    #[error("malformed token")]
    Malformed,

    /// The header names an algorithm other than HS256.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match.
    #[error("invalid token signature")]
    BadSignature,

    /// The token is past its expiry.
    #[error("token expired")]
    Expired,

    /// The signing key could not be used.
    #[error("invalid signing key")]
    InvalidKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Verified token contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user.
    pub id: UserId,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expires at (Unix seconds).
    pub exp: i64,
}

/// Issues and verifies bearer tokens with one shared key.
#[derive(Clone)]
pub struct TokenSigner {
    key: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(key: SecretString, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    /// Issue a token for `user` valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidKey` if the key cannot be used for HMAC.
    pub fn issue(&self, user: UserId) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a token for `user` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidKey` if the key cannot be used for HMAC.
    pub fn issue_at(&self, user: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            id: user,
            iat,
            exp: iat.saturating_add(ttl),
        };
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let signing_input = format!("{}.{}", encode_json(&header)?, encode_json(&claims)?);
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token against the current time.
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` if the token is malformed, signed with another
    /// key or algorithm, or expired.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenSigner::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let mut parts = signing_input.split('.');
        let (Some(header), Some(claims), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_json(header)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        // Signature is checked before the claims are trusted.
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_json(claims)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self) -> Result<Hmac<Sha256>, TokenError> {
        Hmac::<Sha256>::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|_| TokenError::InvalidKey)
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|_| TokenError::Malformed)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn signer(key: &str) -> TokenSigner {
        TokenSigner::new(SecretString::from(key.to_string()), DAY * 30)
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer("k1-aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%");
        let token = signer.issue(UserId::new(42)).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.id, UserId::new(42));
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 60 * 60);
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer("k1-aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%");
        let issued = Utc::now() - TimeDelta::days(31);
        let token = signer.issue_at(UserId::new(1), issued).unwrap();

        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
        assert!(
            signer
                .verify_at(&token, issued + TimeDelta::days(29))
                .is_ok()
        );
    }

    #[test]
    fn test_other_key_rejected() {
        let token = signer("first-key-aB3$xY9!mK2@nL5#pQ7&rT0")
            .issue(UserId::new(1))
            .unwrap();
        let result = signer("second-key-aB3$xY9!mK2@nL5#pQ7&rT0").verify(&token);
        assert_eq!(result, Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer("k1-aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%");
        let token = signer.issue(UserId::new(1)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = URL_SAFE_NO_PAD.encode(br#"{"id":2,"iat":0,"exp":99999999999}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);

        assert_eq!(signer.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let signer = signer("k1-aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert_eq!(signer.verify(token), Err(TokenError::Malformed), "{token:?}");
        }
    }

    #[test]
    fn test_alg_none_rejected() {
        let signer = signer("k1-aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%");
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"id":1,"iat":0,"exp":99999999999}"#);
        let token = format!("{header}.{claims}.");

        assert_eq!(
            signer.verify(&token),
            Err(TokenError::UnsupportedAlgorithm("none".to_string()))
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = signer("super-private-signing-key-0123456789");
        assert!(!format!("{signer:?}").contains("super-private"));
    }
}
