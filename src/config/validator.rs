//! Settings validation: values that parse but cannot work.

use crate::config::Settings;
use crate::error::ConfigError;

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let url = &settings.database.url;
    if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        return Err(ConfigError::Invalid {
            name: "DATABASE_URL",
            reason: "expected a postgres:// or postgresql:// URL".into(),
        });
    }
    if settings.database.max_connections == 0 {
        return Err(ConfigError::Invalid {
            name: "DB_MAX_CONNECTIONS",
            reason: "must be at least 1".into(),
        });
    }
    if settings.auth.access_token_ttl <= chrono::Duration::zero() {
        return Err(ConfigError::Invalid {
            name: "ACCESS_TOKEN_EXPIRE_MINUTES",
            reason: "must be positive".into(),
        });
    }
    if settings.auth.refresh_token_ttl <= chrono::Duration::zero() {
        return Err(ConfigError::Invalid {
            name: "REFRESH_TOKEN_EXPIRE_DAYS",
            reason: "must be positive".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use crate::error::ConfigError;

    #[test]
    fn rejects_non_postgres_urls_and_empty_pools() {
        let err = Settings::from_lookup(|k| match k {
            "DATABASE_URL" => Some("mysql://localhost/books".into()),
            "SECRET_KEY" => Some("k".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DATABASE_URL", .. }));

        let err = Settings::from_lookup(|k| match k {
            "DATABASE_URL" => Some("postgresql://localhost/books".into()),
            "SECRET_KEY" => Some("k".into()),
            "DB_MAX_CONNECTIONS" => Some("0".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DB_MAX_CONNECTIONS", .. }));
    }

    #[test]
    fn rejects_non_positive_token_lifetimes() {
        let err = Settings::from_lookup(|k| match k {
            "DATABASE_URL" => Some("postgres://localhost/books".into()),
            "SECRET_KEY" => Some("k".into()),
            "REFRESH_TOKEN_EXPIRE_DAYS" => Some("0".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "REFRESH_TOKEN_EXPIRE_DAYS", .. }));
    }
}
