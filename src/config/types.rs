//! Resource configuration: one typed struct per controller instantiation.

use crate::query::{Populate, Sort};
use crate::service::{CreateShaper, QueryAugmenter, Validator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// How DELETE behaves, chosen once per resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Physically remove the document. Restore is unavailable.
    #[default]
    Hard,
    /// Mark with `deletedAt` / `deletedBy`; hidden from reads until restored.
    Soft,
}

#[derive(Clone)]
pub struct ResourceConfig {
    /// Collection (table) name; also the default display name.
    pub collection: String,
    /// Singular name used in messages ("Customer not found").
    pub display_name: String,
    pub ownership_field: Option<String>,
    pub allow_public_read: bool,
    pub delete_mode: DeleteMode,
    pub searchable_fields: Vec<String>,
    pub populate: Vec<Populate>,
    pub default_sort: Vec<Sort>,
    pub default_limit: u64,
    pub max_limit: u64,
    pub unique_fields: Vec<String>,
    pub query_augmenter: Option<Arc<dyn QueryAugmenter>>,
    pub create_validator: Option<Arc<dyn Validator>>,
    pub update_validator: Option<Arc<dyn Validator>>,
    pub create_shaper: Option<Arc<dyn CreateShaper>>,
}

impl ResourceConfig {
    pub fn new(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        ResourceConfig {
            display_name: collection.clone(),
            collection,
            ownership_field: None,
            allow_public_read: false,
            delete_mode: DeleteMode::Hard,
            searchable_fields: Vec::new(),
            populate: Vec::new(),
            default_sort: vec![Sort::desc("createdAt")],
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            unique_fields: Vec::new(),
            query_augmenter: None,
            create_validator: None,
            update_validator: None,
            create_shaper: None,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn owned_by(mut self, field: impl Into<String>) -> Self {
        self.ownership_field = Some(field.into());
        self
    }

    pub fn public_read(mut self, allow: bool) -> Self {
        self.allow_public_read = allow;
        self
    }

    pub fn soft_delete(mut self) -> Self {
        self.delete_mode = DeleteMode::Soft;
        self
    }

    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn populate(mut self, field: impl Into<String>, collection: impl Into<String>) -> Self {
        self.populate.push(Populate::new(field, collection));
        self
    }

    pub fn default_sort(mut self, sort: Vec<Sort>) -> Self {
        self.default_sort = sort;
        self
    }

    pub fn page_size(mut self, default_limit: u64, max_limit: u64) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    pub fn unique<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn augment_query(mut self, augmenter: impl QueryAugmenter + 'static) -> Self {
        self.query_augmenter = Some(Arc::new(augmenter));
        self
    }

    pub fn validate_create(mut self, validator: impl Validator + 'static) -> Self {
        self.create_validator = Some(Arc::new(validator));
        self
    }

    pub fn validate_update(mut self, validator: impl Validator + 'static) -> Self {
        self.update_validator = Some(Arc::new(validator));
        self
    }

    pub fn shape_create(mut self, shaper: impl CreateShaper + 'static) -> Self {
        self.create_shaper = Some(Arc::new(shaper));
        self
    }
}

impl fmt::Debug for ResourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConfig")
            .field("collection", &self.collection)
            .field("ownership_field", &self.ownership_field)
            .field("allow_public_read", &self.allow_public_read)
            .field("delete_mode", &self.delete_mode)
            .field("searchable_fields", &self.searchable_fields)
            .field("populate", &self.populate)
            .field("default_sort", &self.default_sort)
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .field("unique_fields", &self.unique_fields)
            .field("query_augmenter", &self.query_augmenter.is_some())
            .field("create_validator", &self.create_validator.is_some())
            .field("update_validator", &self.update_validator.is_some())
            .field("create_shaper", &self.create_shaper.is_some())
            .finish()
    }
}
