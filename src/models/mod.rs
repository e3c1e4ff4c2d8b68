//! Typed rows and request payloads for every table.

/// Enum stored as text: `as_str`, `Display`, `FromStr`, sqlx decoding and binding.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err($crate::models::UnknownVariant {
                        kind: stringify!($ty),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(s.parse()?)
            }
        }

        impl From<$ty> for $crate::sql::PgBindValue {
            fn from(v: $ty) -> Self {
                $crate::sql::PgBindValue::Text(Some(v.as_str().to_string()))
            }
        }
    };
}

mod author;
mod book;
mod category;
mod link;
mod order;
mod paging;
mod promotion;
mod publisher;
mod review;
mod user;

pub use author::*;
pub use book::*;
pub use category::*;
pub use link::*;
pub use order::*;
pub use paging::*;
pub use promotion::*;
pub use publisher::*;
pub use review::*;
pub use user::*;

use crate::sql::PgBindValue;
use serde::Serialize;
use sqlx::postgres::PgRow;
use thiserror::Error;

/// Column/value pairs for INSERT or UPDATE, in statement order.
pub type Fields = Vec<(&'static str, PgBindValue)>;

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// A row type bound to one table.
pub trait Entity: for<'r> sqlx::FromRow<'r, PgRow> + Serialize + Send + Unpin {
    const TABLE: &'static str;
    /// Human-readable name used in error messages.
    const LABEL: &'static str;
    /// Column cleared by a soft delete. `None` means rows are removed.
    const ACTIVE_COLUMN: Option<&'static str> = Some("is_active");
    const TOUCHES_UPDATED_AT: bool = true;
}

/// Push `column` only when a value was supplied. Absent and null both mean "leave as is".
pub(crate) fn set<T: Into<PgBindValue>>(fields: &mut Fields, column: &'static str, value: Option<T>) {
    if let Some(v) = value {
        fields.push((column, v.into()));
    }
}
