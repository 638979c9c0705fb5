//! Resource and process configuration.

pub mod service;
pub mod types;
pub mod validator;

pub use service::*;
pub use types::*;
pub use validator::*;
