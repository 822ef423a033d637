//! Signed, time-limited bearer tokens (HMAC JWS).

use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{TokenClaims, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Any verification failure: bad signature, malformed token, missing
    /// identity, expired. Callers never learn which check failed.
    #[error("Invalid Credentials")]
    InvalidCredentials,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Shared-secret signing algorithms accepted in configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl SigningAlgorithm {
    fn as_jwt(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(format!("unsupported signing algorithm '{other}' (expected HS256, HS384 or HS512)")),
        }
    }
}

impl core::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        };
        f.write_str(name)
    }
}

/// Issues and verifies bearer tokens.
///
/// Built once at startup from configuration and shared behind an `Arc`.
/// Both operations take `now` explicitly so expiry is testable.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: SigningAlgorithm,
    ttl: Duration,
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], algorithm: SigningAlgorithm, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `identity` into a token that expires at `now + ttl`.
    pub fn issue(&self, identity: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = TokenClaims::new(identity, now + self.ttl);
        jsonwebtoken::encode(&Header::new(self.algorithm.as_jwt()), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check signature, structure, identity and expiry; return the identity.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        // Expiry is checked against the caller's clock in `validate_claims`,
        // not against the library's.
        let mut validation = Validation::new(self.algorithm.as_jwt());
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected during decode");
            AuthError::InvalidCredentials
        })?;

        let identity = validate_claims(&data.claims, now).map_err(|e| {
            tracing::debug!(error = %e, "token rejected during claim validation");
            AuthError::InvalidCredentials
        })?;

        Ok(identity.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret.as_bytes(), SigningAlgorithm::Hs256, Duration::minutes(30))
    }

    #[test]
    fn issued_token_verifies_to_the_same_identity() {
        let svc = service("s3cret");
        let now = Utc::now();
        let token = svc.issue("a@x.com", now).unwrap();

        assert_eq!(svc.verify(&token, now).unwrap(), "a@x.com");
        assert_eq!(svc.verify(&token, now + Duration::minutes(29)).unwrap(), "a@x.com");
    }

    #[test]
    fn token_past_ttl_is_rejected() {
        let svc = service("s3cret");
        let now = Utc::now();
        let token = svc.issue("a@x.com", now).unwrap();

        let later = now + svc.ttl() + Duration::seconds(1);
        assert_eq!(svc.verify(&token, later), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = service("one").issue("a@x.com", now).unwrap();
        assert_eq!(service("two").verify(&token, now), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn wrong_algorithm_is_rejected() {
        let now = Utc::now();
        let hs512 = TokenService::new(b"s3cret", SigningAlgorithm::Hs512, Duration::minutes(5));
        let token = hs512.issue("a@x.com", now).unwrap();
        assert_eq!(service("s3cret").verify(&token, now), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let svc = service("s3cret");
        let now = Utc::now();
        for token in ["", "not-a-token", "a.b.c"] {
            assert_eq!(svc.verify(token, now), Err(AuthError::InvalidCredentials));
        }
    }

    #[test]
    fn token_without_identity_is_rejected() {
        let now = Utc::now();
        let claims = TokenClaims {
            user_email: None,
            exp: (now + Duration::minutes(5)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();

        assert_eq!(service("s3cret").verify(&token, now), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn algorithm_names_parse_case_insensitively() {
        assert_eq!("hs384".parse::<SigningAlgorithm>(), Ok(SigningAlgorithm::Hs384));
        assert_eq!(" HS512 ".parse::<SigningAlgorithm>(), Ok(SigningAlgorithm::Hs512));
        assert!("RS256".parse::<SigningAlgorithm>().is_err());
        assert_eq!(SigningAlgorithm::default().to_string(), "HS256");
    }
}
