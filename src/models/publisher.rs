use super::{set, Entity, Fields};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub country: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Publisher {
    const TABLE: &'static str = "publishers";
    const LABEL: &'static str = "publisher";
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PublisherCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl PublisherCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .required("name", &self.name, 150)
            .max_length("logo_url", self.logo_url.as_deref(), 255)
            .max_length("website", self.website.as_deref(), 255)
            .max_length("country", self.country.as_deref(), 100)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f: Fields = vec![("name", self.name.trim().to_string().into())];
        set(&mut f, "description", self.description);
        set(&mut f, "logo_url", self.logo_url);
        set(&mut f, "website", self.website);
        set(&mut f, "country", self.country);
        f
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct PublisherUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub country: Option<String>,
    pub is_active: Option<bool>,
}

impl PublisherUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .not_blank("name", self.name.as_deref(), 150)
            .max_length("logo_url", self.logo_url.as_deref(), 255)
            .max_length("website", self.website.as_deref(), 255)
            .max_length("country", self.country.as_deref(), 100)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "name", self.name.map(|n| n.trim().to_string()));
        set(&mut f, "description", self.description);
        set(&mut f, "logo_url", self.logo_url);
        set(&mut f, "website", self.website);
        set(&mut f, "country", self.country);
        set(&mut f, "is_active", self.is_active);
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PgBindValue;

    #[test]
    fn rejects_overlong_fields() {
        let body = PublisherCreate {
            name: "Editorial Sur".into(),
            description: None,
            logo_url: Some(format!("https://img.example.com/{}", "a".repeat(255))),
            website: None,
            country: Some("c".repeat(101)),
        };
        let msg = body.validate().unwrap_err().to_string();
        assert!(msg.contains("logo_url must be at most 255 characters"));
        assert!(msg.contains("country must be at most 100 characters"));
    }

    #[test]
    fn create_fields_follow_the_payload() {
        let body: PublisherCreate =
            serde_json::from_str(r#"{"name":" Anagrama ","country":"España","website":"https://anagrama.example"}"#).unwrap();
        body.validate().unwrap();
        let fields = body.into_fields();
        assert_eq!(
            fields,
            vec![
                ("name", PgBindValue::from("Anagrama")),
                ("website", PgBindValue::from("https://anagrama.example")),
                ("country", PgBindValue::from("España")),
            ]
        );
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let patch: PublisherUpdate = serde_json::from_str("{}").unwrap();
        assert!(patch.validate().is_ok());
        assert!(patch.into_fields().is_empty());
        let patch: PublisherUpdate = serde_json::from_str(r#"{"name":" "}"#).unwrap();
        assert!(patch.validate().is_err());
    }
}
