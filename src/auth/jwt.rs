use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::domain::{Actor, Role};

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Applicant id for `SOLICITANTE`, employee id otherwise.
    pub sub: i64,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn actor(&self) -> Actor {
        Actor::new(self.sub, self.role)
    }
}

/// HS256 signer/verifier.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, id: i64, role: Role, name: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: id,
            role,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            })
    }

    /// Extracts the token from an `Authorization: Bearer ...` header value.
    pub fn bearer(header: Option<&str>) -> Result<&str, AuthError> {
        header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new("test-secret", 60);
        let token = issuer.issue(7, Role::Ventanilla, "Ana").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Ventanilla);
        assert_eq!(claims.actor(), Actor::new(7, Role::Ventanilla));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new("test-secret", -5);
        let token = issuer.issue(1, Role::Solicitante, "Luis").unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let issuer = TokenIssuer::new("test-secret", 60);
        let other = TokenIssuer::new("another-secret", 60);
        let token = other.issue(1, Role::Admin, "Root").unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(TokenIssuer::bearer(Some("Bearer abc")).unwrap(), "abc");
        assert!(TokenIssuer::bearer(Some("Basic abc")).is_err());
        assert!(TokenIssuer::bearer(Some("Bearer ")).is_err());
        assert!(TokenIssuer::bearer(None).is_err());
    }
}
