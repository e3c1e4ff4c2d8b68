//! User accounts: creation, credential checks, password changes.

use crate::auth::{hash_password, issue_token, verify_password, verify_token, TokenKind};
use crate::config::AuthSettings;
use crate::error::AppError;
use crate::models::{TokenResponse, User, UserCreate, UserUpdate};
use crate::service::CrudService;
use crate::sql::Condition;
use sqlx::PgPool;

pub struct AccountService;

impl AccountService {
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let email = email.trim().to_lowercase();
        CrudService::find_one::<User>(pool, &[Condition::Eq("email", email.into())]).await
    }

    /// Create an account. The email must not be registered yet.
    pub async fn create(pool: &PgPool, body: UserCreate) -> Result<User, AppError> {
        body.validate()?;
        Self::ensure_email_free(pool, &body.email(), None).await?;
        let hash = hash_password(body.password.clone()).await?;
        let user: User = CrudService::create(pool, &body.into_fields(hash)).await?;
        tracing::info!(user_id = user.id, role = %user.role, "account created");
        Ok(user)
    }

    pub async fn update(pool: &PgPool, id: i64, patch: UserUpdate) -> Result<User, AppError> {
        patch.validate()?;
        if let Some(email) = patch.email.as_deref() {
            Self::ensure_email_free(pool, email, Some(id)).await?;
        }
        CrudService::update::<User>(pool, id, &patch.into_fields()).await
    }

    async fn ensure_email_free(pool: &PgPool, email: &str, except: Option<i64>) -> Result<(), AppError> {
        let email = email.trim().to_lowercase();
        let mut conditions = vec![Condition::Eq("email", email.into())];
        if let Some(id) = except {
            conditions.push(Condition::Ne("id", id.into()));
        }
        if CrudService::exists::<User>(pool, &conditions).await? {
            return Err(AppError::Conflict("a user with this email already exists".into()));
        }
        Ok(())
    }

    /// Check email and password. Unknown emails and wrong passwords get the same answer.
    pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> Result<User, AppError> {
        let invalid = || AppError::Unauthorized("incorrect email or password".into());
        let user = Self::find_by_email(pool, email).await?.ok_or_else(invalid)?;
        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::info!(user_id = user.id, "login rejected: wrong password");
            return Err(invalid());
        }
        if !user.is_active {
            return Err(AppError::Unauthorized("account is deactivated".into()));
        }
        Self::touch_last_active(pool, user.id).await
    }

    /// Stamp `last_active_at` without bumping `updated_at`.
    pub async fn touch_last_active(pool: &PgPool, id: i64) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("UPDATE \"users\" SET \"last_active_at\" = NOW() WHERE \"id\" = $1 RETURNING *")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))
    }

    pub async fn change_password(pool: &PgPool, user: &User, current: &str, new: &str) -> Result<(), AppError> {
        if !verify_password(current.to_string(), user.password_hash.clone()).await? {
            return Err(AppError::BadRequest("current password is incorrect".into()));
        }
        let hash = hash_password(new.to_string()).await?;
        CrudService::update::<User>(pool, user.id, &[("password_hash", hash.into())]).await?;
        tracing::info!(user_id = user.id, "password changed");
        Ok(())
    }

    /// Access and refresh tokens for a signed-in user.
    pub fn token_pair(settings: &AuthSettings, user: User) -> Result<TokenResponse, AppError> {
        Ok(TokenResponse {
            access_token: issue_token(settings, user.id, TokenKind::Access)?,
            refresh_token: issue_token(settings, user.id, TokenKind::Refresh)?,
            token_type: "bearer".into(),
            expires_in: settings.access_token_seconds(),
            user,
        })
    }

    /// Exchange a refresh token for a new pair. The user must still exist and be active.
    pub async fn refresh(pool: &PgPool, settings: &AuthSettings, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let user_id = verify_token(settings, refresh_token, TokenKind::Refresh)?;
        let user = CrudService::read::<User>(pool, user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Unauthorized("user is not valid".into()))?;
        Self::token_pair(settings, user)
    }
}
