//! ResourceController: generic CRUD over one collection plus its pluggable strategies.

mod crud;
mod hooks;
mod validation;

pub use crud::ResourceController;
pub use hooks::{format_timestamp, Chain, CreateShaper, DateRange, ExactMatch, ListParams, QueryAugmenter};
pub use validation::{RuleValidator, Validator, Verdict};
