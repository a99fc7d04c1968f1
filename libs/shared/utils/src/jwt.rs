use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("JWT secret is not set")]
    MissingSecret,
    #[error("Invalid token format")]
    Malformed,
    #[error("Invalid signature encoding")]
    SignatureEncoding,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Invalid claims encoding")]
    ClaimsEncoding,
    #[error("Invalid claims format")]
    ClaimsFormat,
    #[error("Token expired")]
    Expired,
}

/// Verifies an HS256 bearer token and returns the caller it identifies.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, TokenError> {
    if jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(TokenError::Malformed),
    };

    verify_signature(header_b64, claims_b64, signature_b64, jwt_secret)?;
    let claims = decode_claims(claims_b64)?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(TokenError::Expired);
        }
    }

    let created_at = claims.iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

fn verify_signature(header_b64: &str, claims_b64: &str, signature_b64: &str, secret: &str) -> Result<(), TokenError> {
    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        TokenError::SignatureEncoding
    })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| TokenError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    mac.verify_slice(&signature).map_err(|_| {
        debug!("Token signature verification failed");
        TokenError::BadSignature
    })
}

fn decode_claims(claims_b64: &str) -> Result<JwtClaims, TokenError> {
    let bytes = URL_SAFE_NO_PAD.decode(claims_b64).map_err(|_| TokenError::ClaimsEncoding)?;
    let claims_json = String::from_utf8(bytes).map_err(|_| TokenError::ClaimsEncoding)?;

    serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        TokenError::ClaimsFormat
    })
}
