//! Request extractors: bearer-token users and input parsing that answers with the error envelope.

mod auth;
mod input;

pub use auth::{bearer_token, CurrentUser, StaffUser};
pub use input::{ApiJson, ApiPath, ApiQuery};
