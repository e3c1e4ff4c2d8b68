//! Runtime settings for the server, the database and token issuing.

use jsonwebtoken::Algorithm;
use std::net::SocketAddr;

#[derive(Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    pub cors_allowed_origins: CorsOrigins,
    /// Logs SQL text and parameters at debug level.
    pub debug: bool,
}

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    /// Create the database through the `postgres` maintenance DB when it is missing.
    pub create_if_missing: bool,
    /// Drop every table before creating the schema.
    pub reset_schema_on_startup: bool,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

impl AuthSettings {
    /// Access-token lifetime in seconds, as reported to clients in `expires_in`.
    pub fn access_token_seconds(&self) -> i64 {
        self.access_token_ttl.num_seconds()
    }
}
