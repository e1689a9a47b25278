//! Session token signing and verification.
//!
//! Bearer tokens are HS256 JWTs signed with a single server-wide secret.
//! The secret is injected at construction and never read from the process
//! environment on the request path; rotating it invalidates every
//! outstanding token at once. Tokens carry only the subject id plus the
//! issued-at and expiry timestamps and are not stored server-side.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

/// Fixed token lifetime of two hours.
pub const TOKEN_TTL_SECONDS: i64 = 2 * 60 * 60;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokenHeader {
    pub alg: String,
    pub typ: String,
}

impl SessionTokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokenClaims {
    /// Subject account id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("signing secret shorter than {MIN_SECRET_BYTES} bytes")]
    WeakSecret,
    #[error("invalid signing key")]
    Key,
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Issues and verifies session tokens with one HS256 secret.
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    /// Build a signer from the configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WeakSecret`] for secrets below [`MIN_SECRET_BYTES`];
    /// startup should treat this as fatal.
    pub fn new(secret: &SecretString) -> Result<Self, Error> {
        let bytes = secret.expose_secret().as_bytes();
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(Error::WeakSecret);
        }
        Ok(Self {
            secret: bytes.to_vec(),
        })
    }

    fn mac(&self) -> Result<HmacSha256, Error> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| Error::Key)
    }

    /// Create a signed token for `subject`, expiring [`TOKEN_TTL_SECONDS`]
    /// after `now_unix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header or claims cannot be encoded or the
    /// key is rejected.
    pub fn issue(&self, subject: &str, now_unix: i64) -> Result<String, Error> {
        let claims = SessionTokenClaims {
            sub: subject.to_string(),
            iat: now_unix,
            exp: now_unix + TOKEN_TTL_SECONDS,
        };

        let header_b64 = b64e_json(&SessionTokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_b64 = Base64UrlUnpadded::encode_string(signature.as_slice());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token at `now_unix` and return its decoded claims.
    ///
    /// The signature is checked before the expiry so a token signed with
    /// the wrong secret never reports [`Error::Expired`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token is malformed or contains invalid base64/json,
    /// - the algorithm is not HS256,
    /// - the signature does not verify,
    /// - the expiry has passed.
    pub fn verify(&self, token: &str, now_unix: i64) -> Result<SessionTokenClaims, Error> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
        if parts.next().is_some() {
            return Err(Error::TokenFormat);
        }

        let header: SessionTokenHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| Error::InvalidSignature)?;

        let claims: SessionTokenClaims = b64d_json(claims_b64)?;
        if claims.exp <= now_unix {
            return Err(Error::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const SUBJECT: &str = "0192d7a4-33b5-7d30-a1c2-55aa41e1a3f3";

    fn signer() -> TokenSigner {
        let secret = SecretString::from("0123456789abcdef0123456789abcdef".to_string());
        TokenSigner::new(&secret).expect("valid secret")
    }

    fn other_signer() -> TokenSigner {
        let secret = SecretString::from("fedcba9876543210fedcba9876543210".to_string());
        TokenSigner::new(&secret).expect("valid secret")
    }

    #[test]
    fn rejects_short_secret() {
        let secret = SecretString::from("too-short".to_string());
        assert!(matches!(TokenSigner::new(&secret), Err(Error::WeakSecret)));
    }

    #[test]
    fn issue_then_verify_round_trip() -> Result<(), Error> {
        let signer = signer();
        let token = signer.issue(SUBJECT, NOW)?;
        let claims = signer.verify(&token, NOW + 1)?;
        assert_eq!(claims.sub, SUBJECT);
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + TOKEN_TTL_SECONDS);
        Ok(())
    }

    #[test]
    fn expires_exactly_at_lifetime() -> Result<(), Error> {
        let signer = signer();
        let token = signer.issue(SUBJECT, NOW)?;

        let result = signer.verify(&token, NOW + TOKEN_TTL_SECONDS - 1);
        assert!(result.is_ok());

        let result = signer.verify(&token, NOW + TOKEN_TTL_SECONDS);
        assert!(matches!(result, Err(Error::Expired)));
        Ok(())
    }

    #[test]
    fn wrong_secret_is_invalid_signature_even_when_expired() -> Result<(), Error> {
        let token = other_signer().issue(SUBJECT, NOW)?;

        // Well past expiry, yet the signature failure must win.
        let result = signer().verify(&token, NOW + TOKEN_TTL_SECONDS + 999);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn tampered_claims_fail_signature() -> Result<(), Error> {
        let signer = signer();
        let token = signer.issue(SUBJECT, NOW)?;

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = b64e_json(&SessionTokenClaims {
            sub: "someone-else".to_string(),
            iat: NOW,
            exp: NOW + TOKEN_TTL_SECONDS,
        })?;
        parts[1] = &forged;
        let forged_token = parts.join(".");

        let result = signer.verify(&forged_token, NOW);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn rejects_malformed_tokens() {
        let signer = signer();
        assert!(matches!(
            signer.verify("not-a-token", NOW),
            Err(Error::TokenFormat)
        ));
        assert!(matches!(
            signer.verify("a.b.c.d", NOW),
            Err(Error::TokenFormat)
        ));
        assert!(matches!(
            signer.verify("!!.!!.!!", NOW),
            Err(Error::Base64)
        ));
    }

    #[test]
    fn rejects_unsupported_algorithm() -> Result<(), Error> {
        let signer = signer();
        let token = signer.issue(SUBJECT, NOW)?;
        let mut parts: Vec<&str> = token.split('.').collect();

        let forged_header = b64e_json(&SessionTokenHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        })?;
        parts[0] = &forged_header;
        let forged_token = parts.join(".");

        let result = signer.verify(&forged_token, NOW);
        assert!(matches!(result, Err(Error::UnsupportedAlg(alg)) if alg == "none"));
        Ok(())
    }
}
