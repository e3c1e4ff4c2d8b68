use super::{set, Entity, Fields};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Categories form a tree through `parent_id`.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    const TABLE: &'static str = "categories";
    const LABEL: &'static str = "category";
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CategoryCreate {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

impl CategoryCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .required("name", &self.name, 100)
            .max_length("image_url", self.image_url.as_deref(), 255)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f: Fields = vec![("name", self.name.trim().to_string().into())];
        set(&mut f, "image_url", self.image_url);
        set(&mut f, "description", self.description);
        set(&mut f, "parent_id", self.parent_id);
        set(&mut f, "display_order", self.display_order);
        f
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl CategoryUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .not_blank("name", self.name.as_deref(), 100)
            .max_length("image_url", self.image_url.as_deref(), 255)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "name", self.name.map(|n| n.trim().to_string()));
        set(&mut f, "image_url", self.image_url);
        set(&mut f, "description", self.description);
        set(&mut f, "parent_id", self.parent_id);
        set(&mut f, "display_order", self.display_order);
        set(&mut f, "is_active", self.is_active);
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PgBindValue;

    #[test]
    fn name_is_required_and_bounded() {
        let blank: CategoryCreate = serde_json::from_str(r#"{"name":"   "}"#).unwrap();
        assert!(blank.validate().unwrap_err().to_string().contains("name is required"));
        let long = CategoryCreate {
            name: "x".repeat(101),
            image_url: None,
            description: None,
            parent_id: None,
            display_order: None,
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn create_fields_trim_the_name_and_keep_the_parent() {
        let body: CategoryCreate = serde_json::from_str(r#"{"name":" Poesía ","parent_id":4,"display_order":2}"#).unwrap();
        body.validate().unwrap();
        let fields = body.into_fields();
        assert_eq!(fields[0], ("name", PgBindValue::from("Poesía")));
        assert!(fields.contains(&("parent_id", PgBindValue::I64(Some(4)))));
        assert!(fields.contains(&("display_order", PgBindValue::I32(Some(2)))));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn patch_sets_only_supplied_columns() {
        let patch: CategoryUpdate = serde_json::from_str(r#"{"is_active":false,"description":null}"#).unwrap();
        patch.validate().unwrap();
        assert_eq!(patch.into_fields(), vec![("is_active", PgBindValue::Bool(Some(false)))]);
        let patch = CategoryUpdate {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
