//! JWT token generation and validation

use crate::config::AuthSettings;
use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims. `sub` is the user id as a string.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

/// Sign a token of the given kind for `user_id`, valid for the configured lifetime.
pub fn issue_token(settings: &AuthSettings, user_id: i64, kind: TokenKind) -> Result<String, AppError> {
    let ttl = match kind {
        TokenKind::Access => settings.access_token_ttl,
        TokenKind::Refresh => settings.refresh_token_ttl,
    };
    let now = chrono::Utc::now();
    let exp = now
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal("token expiry out of range".into()))?;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        kind,
    };
    encode(
        &Header::new(settings.algorithm),
        &claims,
        &EncodingKey::from_secret(settings.secret_key.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
}

/// Check signature, expiry and kind; returns the user id.
pub fn verify_token(settings: &AuthSettings, token: &str, expected: TokenKind) -> Result<i64, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret_key.as_bytes()),
        &Validation::new(settings.algorithm),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        AppError::Unauthorized("invalid or expired token".into())
    })?;
    if data.claims.kind != expected {
        return Err(AppError::Unauthorized("invalid token type".into()));
    }
    data.claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("invalid token subject".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;

    fn settings() -> AuthSettings {
        AuthSettings {
            secret_key: "test-secret".into(),
            algorithm: Algorithm::HS256,
            access_token_ttl: chrono::Duration::minutes(30),
            refresh_token_ttl: chrono::Duration::days(7),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let s = settings();
        let token = issue_token(&s, 42, TokenKind::Access).unwrap();
        assert_eq!(verify_token(&s, &token, TokenKind::Access).unwrap(), 42);
    }

    #[test]
    fn kind_is_enforced() {
        let s = settings();
        let refresh = issue_token(&s, 7, TokenKind::Refresh).unwrap();
        let err = verify_token(&s, &refresh, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(verify_token(&s, &refresh, TokenKind::Refresh).unwrap(), 7);
    }

    #[test]
    fn expired_and_foreign_tokens_fail() {
        let mut s = settings();
        s.access_token_ttl = chrono::Duration::hours(-2);
        let expired = issue_token(&s, 1, TokenKind::Access).unwrap();
        assert!(verify_token(&settings(), &expired, TokenKind::Access).is_err());

        let mut other = settings();
        other.secret_key = "another-secret".into();
        let foreign = issue_token(&other, 1, TokenKind::Access).unwrap();
        assert!(verify_token(&settings(), &foreign, TokenKind::Access).is_err());
        assert!(verify_token(&settings(), "not.a.token", TokenKind::Access).is_err());
    }
}
