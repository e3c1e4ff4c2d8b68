//! Typed values that sqlx can bind in dynamically built statements.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A nullable value bound to a PostgreSQL parameter. Each variant keeps its
/// SQL type even when null, so `NULL` lands in integer and date columns too.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Bool(Option<bool>),
    I32(Option<i32>),
    I64(Option<i64>),
    Text(Option<String>),
    Decimal(Option<Decimal>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
}

impl PgBindValue {
    pub fn is_null(&self) -> bool {
        match self {
            PgBindValue::Bool(v) => v.is_none(),
            PgBindValue::I32(v) => v.is_none(),
            PgBindValue::I64(v) => v.is_none(),
            PgBindValue::Text(v) => v.is_none(),
            PgBindValue::Decimal(v) => v.is_none(),
            PgBindValue::Date(v) => v.is_none(),
            PgBindValue::Timestamp(v) => v.is_none(),
        }
    }
}

macro_rules! bind_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for PgBindValue {
            fn from(v: $ty) -> Self {
                PgBindValue::$variant(Some(v))
            }
        }

        impl From<Option<$ty>> for PgBindValue {
            fn from(v: Option<$ty>) -> Self {
                PgBindValue::$variant(v)
            }
        }
    };
}

bind_from!(bool, Bool);
bind_from!(i32, I32);
bind_from!(i64, I64);
bind_from!(String, Text);
bind_from!(Decimal, Decimal);
bind_from!(NaiveDate, Date);
bind_from!(DateTime<Utc>, Timestamp);

impl From<&str> for PgBindValue {
    fn from(v: &str) -> Self {
        PgBindValue::Text(Some(v.to_string()))
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        match self {
            PgBindValue::Bool(v) => <Option<bool> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::I32(v) => <Option<i32> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::I64(v) => <Option<i64> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::Text(v) => <Option<String> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::Decimal(v) => <Option<Decimal> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::Date(v) => <Option<NaiveDate> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::Timestamp(v) => {
                <Option<DateTime<Utc>> as Encode<Postgres>>::encode_by_ref(v, buf)
            }
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I32(_) => <i32 as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::Text(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Decimal(_) => <Decimal as Type<Postgres>>::type_info(),
            PgBindValue::Date(_) => <NaiveDate as Type<Postgres>>::type_info(),
            PgBindValue::Timestamp(_) => <DateTime<Utc> as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_keep_type_when_null() {
        assert_eq!(PgBindValue::from(Option::<i32>::None), PgBindValue::I32(None));
        assert!(PgBindValue::from(Option::<NaiveDate>::None).is_null());
        assert_eq!(PgBindValue::from("x"), PgBindValue::Text(Some("x".into())));
        assert!(!PgBindValue::from(7i64).is_null());
    }
}
