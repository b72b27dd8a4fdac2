// Token issuance and password checks for applicants and staff

pub mod jwt;
pub mod password;

pub use jwt::{Claims, TokenIssuer};
pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}
