//! Load settings from environment variables (a `.env` file is read by the binary first).

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use jsonwebtoken::Algorithm;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let server = ServerSettings {
            bind_addr: parse_var(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            cors_allowed_origins: parse_origins(get("CORS_ALLOWED_ORIGINS").as_deref()),
            debug: parse_bool(&get, "DEBUG", false)?,
        };

        let database = DatabaseSettings {
            url: database_url(&get)?,
            max_connections: parse_var(&get, "DB_MAX_CONNECTIONS", 5u32)?,
            create_if_missing: parse_bool(&get, "DB_CREATE_IF_MISSING", true)?,
            reset_schema_on_startup: parse_bool(&get, "RESET_SCHEMA_ON_STARTUP", false)?,
        };

        let secret_key = get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;
        let algorithm = match get("ALGORITHM") {
            Some(s) => parse_algorithm(&s)?,
            None => Algorithm::HS256,
        };
        let access_minutes: i64 = parse_var(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", DEFAULT_ACCESS_TOKEN_MINUTES)?;
        let refresh_days: i64 = parse_var(&get, "REFRESH_TOKEN_EXPIRE_DAYS", DEFAULT_REFRESH_TOKEN_DAYS)?;
        let auth = AuthSettings {
            secret_key,
            algorithm,
            access_token_ttl: chrono::Duration::minutes(access_minutes),
            refresh_token_ttl: chrono::Duration::days(refresh_days),
        };

        let settings = Settings {
            server,
            database,
            auth,
        };
        validate(&settings)?;
        Ok(settings)
    }
}

fn parse_var<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                reason: format!("expected a boolean, got '{}'", v),
            }),
        },
    }
}

fn parse_origins(raw: Option<&str>) -> CorsOrigins {
    match raw {
        None | Some("*") => CorsOrigins::Any,
        Some(list) => {
            let origins: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if origins.is_empty() || origins.iter().any(|o| o == "*") {
                CorsOrigins::Any
            } else {
                CorsOrigins::List(origins)
            }
        }
    }
}

pub fn parse_algorithm(s: &str) -> Result<Algorithm, ConfigError> {
    match s.to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::Invalid {
            name: "ALGORITHM",
            reason: format!("unsupported algorithm '{}' (expected HS256, HS384 or HS512)", other),
        }),
    }
}

/// `DATABASE_URL` wins; otherwise the URL is assembled from the `DB_*` parts.
fn database_url<G>(get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(url) = get("DATABASE_URL") {
        return Ok(url);
    }
    let dialect = get("DB_DIALECT").unwrap_or_else(|| "postgres".into());
    let host = get("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL or DB_HOST"))?;
    let name = get("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
    let credentials = match (get("DB_USER"), get("DB_PASSWORD")) {
        (Some(user), Some(password)) => format!("{}:{}@", user, password),
        (Some(user), None) => format!("{}@", user),
        _ => String::new(),
    };
    let mut url = format!("{}://{}{}/{}", dialect, credentials, host, name);
    if let Some(mode) = get("DB_SSLMODE") {
        url.push_str("?sslmode=");
        url.push_str(&mode);
    }
    Ok(url)
}
