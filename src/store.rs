//! Database bootstrap: create the database when missing and open the pool.

use crate::config::DatabaseSettings;
use crate::error::{AppError, ConfigError};
use crate::sql::quoted;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url).map_err(|e| {
        AppError::Config(ConfigError::Invalid {
            name: "DATABASE_URL",
            reason: e.to_string(),
        })
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Split a URL into the maintenance-database URL (same server, `postgres` db, same query) and the db name.
fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let (without_query, query) = match url.split_once('?') {
        Some((base, q)) => (base, Some(q)),
        None => (url, None),
    };
    let path_start = without_query.rfind('/').ok_or_else(|| {
        AppError::Config(ConfigError::Invalid {
            name: "DATABASE_URL",
            reason: "no database path".into(),
        })
    })? + 1;
    let db_name = without_query.get(path_start..).unwrap_or("").trim().to_string();
    let base = without_query.get(..path_start).unwrap_or(without_query);
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name))
}

pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&settings.url)
        .await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name_and_keeps_query() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@db:5432/bookstore?sslmode=require").unwrap();
        assert_eq!(name, "bookstore");
        assert_eq!(admin, "postgres://u:p@db:5432/postgres?sslmode=require");

        let (admin, name) = parse_db_name_from_url("postgres://localhost/shop").unwrap();
        assert_eq!(name, "shop");
        assert_eq!(admin, "postgres://localhost/postgres");
    }
}
