//! Resource config validation: field names, page bounds, populate targets.

use crate::config::ResourceConfig;
use crate::error::ConfigError;
use crate::pagination::MAX_OFFSET;
use crate::query::is_valid_field;

pub fn validate(config: &ResourceConfig) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidResource {
        collection: config.collection.clone(),
        reason,
    };

    if !is_valid_field(&config.collection) {
        return Err(invalid("collection name must be a plain identifier".into()));
    }

    let mut fields: Vec<&str> = Vec::new();
    fields.extend(config.ownership_field.as_deref());
    fields.extend(config.searchable_fields.iter().map(String::as_str));
    fields.extend(config.unique_fields.iter().map(String::as_str));
    fields.extend(config.default_sort.iter().map(|s| s.field.as_str()));
    fields.extend(config.populate.iter().map(|p| p.field.as_str()));
    if let Some(bad) = fields.into_iter().find(|f| !is_valid_field(f)) {
        return Err(invalid(format!("invalid field name '{}'", bad)));
    }

    if let Some(p) = config.populate.iter().find(|p| !is_valid_field(&p.collection)) {
        return Err(invalid(format!("invalid populate collection '{}'", p.collection)));
    }

    if config.default_limit == 0 || config.max_limit == 0 {
        return Err(invalid("page sizes must be at least 1".into()));
    }
    if config.max_limit > MAX_OFFSET {
        return Err(invalid(format!("max limit {} is out of range", config.max_limit)));
    }
    if config.default_limit > config.max_limit {
        return Err(invalid(format!(
            "default limit {} exceeds max limit {}",
            config.default_limit, config.max_limit
        )));
    }

    Ok(())
}
