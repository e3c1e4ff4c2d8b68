use super::{set, Entity, Fields};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub biography: Option<String>,
    pub image_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub website: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Author {
    const TABLE: &'static str = "authors";
    const LABEL: &'static str = "author";
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AuthorCreate {
    pub name: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl AuthorCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .required("name", &self.name, 200)
            .max_length("image_url", self.image_url.as_deref(), 255)
            .max_length("nationality", self.nationality.as_deref(), 100)
            .max_length("website", self.website.as_deref(), 255)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f: Fields = vec![("name", self.name.trim().to_string().into())];
        set(&mut f, "biography", self.biography);
        set(&mut f, "image_url", self.image_url);
        set(&mut f, "birth_date", self.birth_date);
        set(&mut f, "nationality", self.nationality);
        set(&mut f, "website", self.website);
        f
    }
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct AuthorUpdate {
    pub name: Option<String>,
    pub biography: Option<String>,
    pub image_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub website: Option<String>,
    pub is_active: Option<bool>,
}

impl AuthorUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .not_blank("name", self.name.as_deref(), 200)
            .max_length("image_url", self.image_url.as_deref(), 255)
            .max_length("nationality", self.nationality.as_deref(), 100)
            .max_length("website", self.website.as_deref(), 255)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "name", self.name.map(|n| n.trim().to_string()));
        set(&mut f, "biography", self.biography);
        set(&mut f, "image_url", self.image_url);
        set(&mut f, "birth_date", self.birth_date);
        set(&mut f, "nationality", self.nationality);
        set(&mut f, "website", self.website);
        set(&mut f, "is_active", self.is_active);
        f
    }
}
