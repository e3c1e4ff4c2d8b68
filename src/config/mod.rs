pub mod logging;
pub mod types;
pub mod loader;
pub mod validator;

pub use logging::*;
pub use types::*;
pub use loader::*;
pub use validator::*;
