//! Credentials: bcrypt password hashes and JWT access/refresh tokens.

pub mod jwt;
pub mod password;

pub use jwt::{issue_token, verify_token, Claims, TokenKind};
pub use password::{hash_password, verify_password};
