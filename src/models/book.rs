use super::{set, Entity, Fields};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub sku: Option<String>,
    pub title: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = String, example = "19.90")]
    pub price: Decimal,
    #[schema(value_type = Option<String>)]
    pub original_price: Option<Decimal>,
    pub stock: i32,
    pub min_stock: i32,
    pub cover_url: Option<String>,
    /// JSON-encoded list of image URLs.
    pub extra_images: Option<String>,
    pub publisher_id: Option<i64>,
    pub publication_date: Option<NaiveDate>,
    pub page_count: Option<i32>,
    pub language: String,
    #[schema(value_type = Option<String>)]
    pub weight_kg: Option<Decimal>,
    pub dimensions: Option<String>,
    pub format: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub is_bestseller: bool,
    pub views: i32,
    pub total_sales: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Active and in stock.
    pub fn is_available(&self) -> bool {
        self.is_active && self.stock > 0
    }
}

impl Entity for Book {
    const TABLE: &'static str = "books";
    const LABEL: &'static str = "book";
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookCreate {
    pub title: String,
    #[schema(value_type = String, example = "19.90")]
    pub price: Decimal,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub min_stock: Option<i32>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub extra_images: Option<String>,
    #[serde(default)]
    pub publisher_id: Option<i64>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub is_new: Option<bool>,
    #[serde(default)]
    pub is_bestseller: Option<bool>,
}

impl BookCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .required("title", &self.title, 255)
            .money("price", Some(self.price))
            .money("original_price", self.original_price)
            .non_negative("stock", self.stock)
            .non_negative("min_stock", self.min_stock)
            .positive("page_count", self.page_count)
            .max_length("sku", self.sku.as_deref(), 100)
            .isbn("isbn", self.isbn.as_deref())
            .max_length("cover_url", self.cover_url.as_deref(), 255)
            .json("extra_images", self.extra_images.as_deref())
            .not_blank("language", self.language.as_deref(), 50)
            .max_length("dimensions", self.dimensions.as_deref(), 50)
            .max_length("format", self.format.as_deref(), 50)
            .numeric("weight_kg", self.weight_kg, 8, 3)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f: Fields = vec![
            ("title", self.title.trim().to_string().into()),
            ("price", self.price.into()),
        ];
        set(&mut f, "sku", self.sku);
        set(&mut f, "isbn", self.isbn);
        set(&mut f, "description", self.description);
        set(&mut f, "original_price", self.original_price);
        set(&mut f, "stock", self.stock);
        set(&mut f, "min_stock", self.min_stock);
        set(&mut f, "cover_url", self.cover_url);
        set(&mut f, "extra_images", self.extra_images);
        set(&mut f, "publisher_id", self.publisher_id);
        set(&mut f, "publication_date", self.publication_date);
        set(&mut f, "page_count", self.page_count);
        set(&mut f, "language", self.language);
        set(&mut f, "weight_kg", self.weight_kg);
        set(&mut f, "dimensions", self.dimensions);
        set(&mut f, "format", self.format);
        set(&mut f, "is_featured", self.is_featured);
        set(&mut f, "is_new", self.is_new);
        set(&mut f, "is_bestseller", self.is_bestseller);
        f
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct BookUpdate {
    pub title: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub sku: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub original_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
    pub cover_url: Option<String>,
    pub extra_images: Option<String>,
    pub publisher_id: Option<i64>,
    pub publication_date: Option<NaiveDate>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
    #[schema(value_type = Option<String>)]
    pub weight_kg: Option<Decimal>,
    pub dimensions: Option<String>,
    pub format: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_new: Option<bool>,
    pub is_bestseller: Option<bool>,
}

impl BookUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        RequestValidator::new()
            .not_blank("title", self.title.as_deref(), 255)
            .money("price", self.price)
            .money("original_price", self.original_price)
            .non_negative("stock", self.stock)
            .non_negative("min_stock", self.min_stock)
            .positive("page_count", self.page_count)
            .max_length("sku", self.sku.as_deref(), 100)
            .isbn("isbn", self.isbn.as_deref())
            .max_length("cover_url", self.cover_url.as_deref(), 255)
            .json("extra_images", self.extra_images.as_deref())
            .not_blank("language", self.language.as_deref(), 50)
            .max_length("dimensions", self.dimensions.as_deref(), 50)
            .max_length("format", self.format.as_deref(), 50)
            .numeric("weight_kg", self.weight_kg, 8, 3)
            .finish()
    }

    pub fn into_fields(self) -> Fields {
        let mut f = Fields::new();
        set(&mut f, "title", self.title.map(|t| t.trim().to_string()));
        set(&mut f, "price", self.price);
        set(&mut f, "sku", self.sku);
        set(&mut f, "isbn", self.isbn);
        set(&mut f, "description", self.description);
        set(&mut f, "original_price", self.original_price);
        set(&mut f, "stock", self.stock);
        set(&mut f, "min_stock", self.min_stock);
        set(&mut f, "cover_url", self.cover_url);
        set(&mut f, "extra_images", self.extra_images);
        set(&mut f, "publisher_id", self.publisher_id);
        set(&mut f, "publication_date", self.publication_date);
        set(&mut f, "page_count", self.page_count);
        set(&mut f, "language", self.language);
        set(&mut f, "weight_kg", self.weight_kg);
        set(&mut f, "dimensions", self.dimensions);
        set(&mut f, "format", self.format);
        set(&mut f, "is_active", self.is_active);
        set(&mut f, "is_featured", self.is_featured);
        set(&mut f, "is_new", self.is_new);
        set(&mut f, "is_bestseller", self.is_bestseller);
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PgBindValue;

    fn create(json: &str) -> BookCreate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn price_accepts_numbers_and_strings() {
        assert_eq!(create(r#"{"title":"Rayuela","price":19.9}"#).price, Decimal::new(199, 1));
        assert_eq!(create(r#"{"title":"Rayuela","price":"19.90"}"#).price, Decimal::new(1990, 2));
    }

    #[test]
    fn rejects_negative_stock_and_bad_isbn() {
        let err = create(r#"{"title":"Rayuela","price":10,"stock":-1,"isbn":"12345"}"#)
            .validate()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("stock must be at least 0"));
        assert!(msg.contains("isbn must be 10 or 13 digits"));
    }

    #[test]
    fn rejects_amounts_too_large_for_their_columns() {
        let msg = create(r#"{"title":"Big","price":"123456789.00","weight_kg":"100000"}"#)
            .validate()
            .unwrap_err()
            .to_string();
        assert!(msg.contains("price must be less than 100000000"));
        assert!(msg.contains("weight_kg must be less than 100000"));
        let patch = BookUpdate {
            original_price: Some(Decimal::from(100_000_000)),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn extra_images_must_be_json() {
        assert!(create(r#"{"title":"Rayuela","price":10,"extra_images":"[\"a.jpg\"]"}"#).validate().is_ok());
        let msg = create(r#"{"title":"Rayuela","price":10,"extra_images":"a.jpg, b.jpg"}"#)
            .validate()
            .unwrap_err()
            .to_string();
        assert!(msg.contains("extra_images must be valid JSON"));
        let patch = BookUpdate {
            extra_images: Some("{".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn create_fields_leave_defaults_to_the_database() {
        let fields = create(r#"{"title":" Ficciones ","price":12}"#).into_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], ("title", PgBindValue::from("Ficciones")));
    }

    #[test]
    fn availability_needs_stock_and_active() {
        let mut book = Book {
            id: 1,
            sku: None,
            title: "Ficciones".into(),
            isbn: None,
            description: None,
            price: Decimal::new(1200, 2),
            original_price: None,
            stock: 0,
            min_stock: 5,
            cover_url: None,
            extra_images: None,
            publisher_id: None,
            publication_date: None,
            page_count: None,
            language: "español".into(),
            weight_kg: None,
            dimensions: None,
            format: None,
            is_active: true,
            is_featured: false,
            is_new: false,
            is_bestseller: false,
            views: 0,
            total_sales: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!book.is_available());
        book.stock = 3;
        assert!(book.is_available());
        book.is_active = false;
        assert!(!book.is_available());
    }
}
