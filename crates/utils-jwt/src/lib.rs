use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 15;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("wrong token type: expected {expected}")]
    WrongType { expected: TokenKind },
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Access/refresh token pair as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// HS256 signer/verifier for the two token kinds.
///
/// Access and refresh tokens share the signing key but carry a `token_type`
/// claim; verification rejects a token presented as the wrong kind.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttls(
            secret,
            Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        )
    }

    pub fn with_ttls(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn generate_pair(&self, user_id: Uuid, role: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.sign(user_id, role, TokenKind::Access, self.access_ttl)?,
            refresh: self.sign(user_id, role, TokenKind::Refresh, self.refresh_ttl)?,
        })
    }

    fn sign(
        &self,
        user_id: Uuid,
        role: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            token_type: kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        if decoded.claims.token_type != expected {
            return Err(TokenError::WrongType { expected });
        }
        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-signing-key")
    }

    #[test]
    fn round_trips_access_token_claims() {
        let user_id = Uuid::new_v4();
        let pair = service().generate_pair(user_id, "employee").unwrap();

        let claims = service().verify(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "employee");
        assert_eq!(claims.token_type, TokenKind::Access);
    }

    #[test]
    fn rejects_refresh_token_presented_as_access() {
        let pair = service()
            .generate_pair(Uuid::new_v4(), "scrum_master")
            .unwrap();

        let err = service().verify(&pair.refresh, TokenKind::Access).unwrap_err();
        assert!(matches!(
            err,
            TokenError::WrongType {
                expected: TokenKind::Access
            }
        ));
    }

    #[test]
    fn rejects_garbage_token() {
        assert!(matches!(
            service().verify("not-a-jwt", TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn rejects_token_signed_with_other_key() {
        let other = TokenService::new(b"other-key");
        let pair = other.generate_pair(Uuid::new_v4(), "employee").unwrap();

        assert!(matches!(
            service().verify(&pair.access, TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let svc = TokenService::with_ttls(
            b"test-signing-key",
            Duration::seconds(-120),
            Duration::seconds(-120),
        );
        let pair = svc.generate_pair(Uuid::new_v4(), "employee").unwrap();

        assert!(matches!(
            svc.verify(&pair.access, TokenKind::Access),
            Err(TokenError::Expired)
        ));
    }
}
