//! Bookstore API: catalog, accounts and reviews over PostgreSQL.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::Settings;
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use response::{success_many, success_one};
pub use routes::{app, ApiDoc};
pub use service::CrudService;
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
