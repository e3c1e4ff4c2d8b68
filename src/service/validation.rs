//! Field rules applied to request payloads before they reach the database.

use crate::error::AppError;
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn isbn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{9}[\dXx]|\d{13})$").unwrap_or_else(|_| unreachable!("static pattern")))
}

/// Collects every rule violation, then reports them together as one 422.
#[derive(Debug, Default)]
pub struct RequestValidator {
    errors: Vec<String>,
}

impl RequestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present, not blank, at most `max` characters.
    pub fn required(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(format!("{} is required", field));
        } else {
            self.max_length(field, Some(value), max);
        }
        self
    }

    /// Like `required`, but only when a value was supplied (PATCH).
    pub fn not_blank(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            self.required(field, v, max);
        }
        self
    }

    pub fn max_length(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.errors.push(format!("{} must be at most {} characters", field, max));
            }
        }
        self
    }

    pub fn min_length(&mut self, field: &str, value: Option<&str>, min: usize) -> &mut Self {
        if let Some(v) = value {
            if v.chars().count() < min {
                self.errors.push(format!("{} must be at least {} characters", field, min));
            }
        }
        self
    }

    pub fn non_negative(&mut self, field: &str, value: Option<i32>) -> &mut Self {
        if let Some(n) = value {
            if n < 0 {
                self.errors.push(format!("{} must be at least 0", field));
            }
        }
        self
    }

    /// Non-negative and small enough for a `NUMERIC(precision, scale)` column once rounded to `scale`.
    pub fn numeric(&mut self, field: &str, value: Option<Decimal>, precision: u32, scale: u32) -> &mut Self {
        if let Some(n) = value {
            let limit = Decimal::from(10i64.pow(precision - scale));
            if n < Decimal::ZERO {
                self.errors.push(format!("{} must be at least 0", field));
            } else if n.round_dp(scale) >= limit {
                self.errors.push(format!("{} must be less than {}", field, limit));
            }
        }
        self
    }

    /// An amount of money: `NUMERIC(10,2)`.
    pub fn money(&mut self, field: &str, value: Option<Decimal>) -> &mut Self {
        self.numeric(field, value, 10, 2)
    }

    /// Must parse as JSON.
    pub fn json(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if serde_json::from_str::<serde_json::Value>(v).is_err() {
                self.errors.push(format!("{} must be valid JSON", field));
            }
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: Option<i32>) -> &mut Self {
        if let Some(n) = value {
            if n <= 0 {
                self.errors.push(format!("{} must be greater than 0", field));
            }
        }
        self
    }

    pub fn range(&mut self, field: &str, value: Option<i32>, min: i32, max: i32) -> &mut Self {
        if let Some(n) = value {
            if n < min || n > max {
                self.errors.push(format!("{} must be between {} and {}", field, min, max));
            }
        }
        self
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if !email_re().is_match(v) {
                self.errors.push(format!("{} must be a valid email", field));
            }
        }
        self
    }

    /// ISBN-10 (nine digits plus a digit or `X`) or ISBN-13, without separators.
    pub fn isbn(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if !isbn_re().is_match(v) {
                self.errors.push(format!("{} must be 10 or 13 digits", field));
            }
        }
        self
    }

    /// Record a rule that does not fit the helpers above.
    pub fn push(&mut self, message: impl Into<String>) -> &mut Self {
        self.errors.push(message.into());
        self
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors).join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_all_violations() {
        let err = RequestValidator::new()
            .required("title", "  ", 255)
            .range("rating", Some(6), 1, 5)
            .money("price", Some(Decimal::new(-150, 2)))
            .finish()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation: title is required; rating must be between 1 and 5; price must be at least 0"
        );
    }

    #[test]
    fn accepts_valid_values() {
        RequestValidator::new()
            .required("name", "Julio Cortázar", 200)
            .max_length("nationality", Some("Argentina"), 100)
            .email("email", Some("lector@example.com"))
            .isbn("isbn", Some("9780306406157"))
            .isbn("isbn", Some("080442957X"))
            .positive("page_count", Some(320))
            .money("price", Some(Decimal::ZERO))
            .json("extra_images", Some(r#"["a.jpg","b.jpg"]"#))
            .finish()
            .unwrap();
    }

    #[test]
    fn numeric_columns_reject_values_that_would_overflow() {
        assert!(RequestValidator::new().money("price", Some(Decimal::new(9_999_999_999, 2))).finish().is_ok());
        let err = RequestValidator::new()
            .money("price", Some(Decimal::new(12_345_678_900, 2)))
            .finish()
            .unwrap_err();
        assert_eq!(err.to_string(), "validation: price must be less than 100000000");
        // 99999999.999 rounds up to 100000000.00
        assert!(RequestValidator::new().money("price", Some(Decimal::new(99_999_999_999, 3))).finish().is_err());
        assert!(RequestValidator::new().numeric("weight_kg", Some(Decimal::from(100_000)), 8, 3).finish().is_err());
        assert!(RequestValidator::new().numeric("weight_kg", Some(Decimal::new(99_999_999, 3)), 8, 3).finish().is_ok());
    }

    #[test]
    fn json_must_parse() {
        assert!(RequestValidator::new().json("extra_images", Some("[\"a.jpg\"")).finish().is_err());
        assert!(RequestValidator::new().json("extra_images", None).finish().is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let name = "ñ".repeat(100);
        assert!(RequestValidator::new().required("name", &name, 100).finish().is_ok());
        assert!(RequestValidator::new().required("name", &format!("{}x", name), 100).finish().is_err());
    }

    #[test]
    fn isbn_and_email_shapes() {
        assert!(RequestValidator::new().isbn("isbn", Some("978-0306406157")).finish().is_err());
        assert!(RequestValidator::new().email("email", Some("no-at-sign")).finish().is_err());
        assert!(RequestValidator::new().isbn("isbn", None).email("email", None).finish().is_ok());
    }
}
