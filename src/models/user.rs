use super::{set, Entity, Fields};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
    Staff,
}

text_enum!(UserRole {
    Customer => "customer",
    Admin => "admin",
    Staff => "staff",
});

impl UserRole {
    /// Admin and staff may manage other accounts and moderate reviews.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Staff)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub accepts_marketing: bool,
    pub last_active_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const LABEL: &'static str = "user";
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// New account. `role` is honoured only when staff create the account; self-registration is always `customer`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub accepts_marketing: Option<bool>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl UserCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .required("first_name", &self.first_name, 100)
            .required("last_name", &self.last_name, 100)
            .required("email", &self.email, 255)
            .email("email", Some(self.email.trim()))
            .min_length("password", Some(&self.password), MIN_PASSWORD_LENGTH)
            .max_length("phone", self.phone.as_deref(), 20)
            .finish()
    }

    pub fn email(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn into_fields(self, password_hash: String) -> Fields {
        let mut f: Fields = vec![
            ("first_name", self.first_name.trim().to_string().into()),
            ("last_name", self.last_name.trim().to_string().into()),
            ("email", normalize_email(&self.email).into()),
            ("password_hash", password_hash.into()),
        ];
        set(&mut f, "phone", self.phone);
        set(&mut f, "accepts_marketing", self.accepts_marketing);
        set(&mut f, "role", self.role);
        f
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub accepts_marketing: Option<bool>,
    /// Staff only.
    pub role: Option<UserRole>,
    /// Staff only.
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .not_blank("first_name", self.first_name.as_deref(), 100)
            .not_blank("last_name", self.last_name.as_deref(), 100)
            .not_blank("email", self.email.as_deref(), 255)
            .email("email", self.email.as_deref().map(str::trim))
            .max_length("phone", self.phone.as_deref(), 20)
            .finish()
    }

    /// True when the patch touches fields only staff may change.
    pub fn is_privileged(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }

    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "first_name", self.first_name.map(|s| s.trim().to_string()));
        set(&mut f, "last_name", self.last_name.map(|s| s.trim().to_string()));
        set(&mut f, "email", self.email.as_deref().map(normalize_email));
        set(&mut f, "phone", self.phone);
        set(&mut f, "accepts_marketing", self.accepts_marketing);
        set(&mut f, "role", self.role);
        set(&mut f, "is_active", self.is_active);
        f
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn email(&self) -> String {
        normalize_email(&self.email)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .min_length("new_password", Some(&self.new_password), MIN_PASSWORD_LENGTH)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [UserRole::Customer, UserRole::Admin, UserRole::Staff] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("root".parse::<UserRole>().is_err());
        assert_eq!(serde_json::to_value(UserRole::Staff).unwrap(), "staff");
        assert!(UserRole::Admin.is_staff() && !UserRole::Customer.is_staff());
    }

    #[test]
    fn password_hash_never_serializes() {
        let user = User {
            id: 1,
            first_name: "Ana".into(),
            last_name: "Pérez".into(),
            email: "ana@example.com".into(),
            password_hash: "$2b$12$hash".into(),
            phone: None,
            role: UserRole::Customer,
            accepts_marketing: false,
            last_active_at: None,
            is_active: true,
            email_verified_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let v = serde_json::to_value(&user).unwrap();
        assert!(v.get("password_hash").is_none());
        assert_eq!(v["role"], "customer");
    }

    #[test]
    fn create_normalizes_email_and_checks_password() {
        let body: UserCreate = serde_json::from_str(
            r#"{"first_name":"Ana","last_name":"Pérez","email":" Ana@Example.COM ","password":"short"}"#,
        )
        .unwrap();
        assert_eq!(body.email(), "ana@example.com");
        let err = body.validate().unwrap_err().to_string();
        assert!(err.contains("password must be at least 8 characters"));
    }

    #[test]
    fn privileged_fields_are_detected() {
        let patch: UserUpdate = serde_json::from_str(r#"{"phone":"123"}"#).unwrap();
        assert!(!patch.is_privileged());
        let patch: UserUpdate = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert!(patch.is_privileged());
    }
}
