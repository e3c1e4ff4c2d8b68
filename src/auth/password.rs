//! Password hashing and verification using bcrypt. Hashing runs on the blocking pool.

use crate::error::AppError;

pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("failed to hash password: {}", e)))
}

/// False on mismatch; an error only when the stored hash is unreadable.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("correct horse".into()).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn unreadable_hash_is_an_error() {
        assert!(verify_password("x".into(), "not-a-hash".into()).await.is_err());
    }
}
