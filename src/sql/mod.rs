//! SQL rendering for the PostgreSQL document store.

mod builder;
mod params;

pub use builder::*;
pub use params::{bind_all, SqlParam};
