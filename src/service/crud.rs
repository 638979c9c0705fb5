//! ResourceController: generic CRUD over one document collection, driven by `ResourceConfig`.

use crate::auth::Principal;
use crate::config::{validate, DeleteMode, ResourceConfig};
use crate::error::{AppError, ConfigError};
use crate::pagination::{PageInfo, PageRequest};
use crate::query::{Condition, Filter, FindOptions, Sort};
use crate::service::hooks::{format_timestamp, ListParams};
use crate::service::Verdict;
use crate::store::{CollectionSpec, DocumentStore};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";
pub const CREATED_BY: &str = "createdBy";
pub const UPDATED_BY: &str = "updatedBy";
pub const DELETED_AT: &str = "deletedAt";
pub const DELETED_BY: &str = "deletedBy";

/// Never accepted from callers; assigned by the controller.
const PROTECTED_FIELDS: &[&str] = &[
    ID, "_id", CREATED_AT, UPDATED_AT, CREATED_BY, UPDATED_BY, DELETED_AT, DELETED_BY,
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

pub struct ResourceController {
    store: Arc<dyn DocumentStore>,
    config: ResourceConfig,
}

impl ResourceController {
    pub fn new(store: Arc<dyn DocumentStore>, config: ResourceConfig) -> Result<Self, ConfigError> {
        validate(&config)?;
        Ok(ResourceController { store, config })
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Create the backing collection and unique constraints.
    pub async fn ensure_collection(&self) -> Result<(), AppError> {
        self.store
            .ensure_collection(&CollectionSpec {
                name: self.config.collection.clone(),
                unique_fields: self.config.unique_fields.clone(),
            })
            .await
    }

    /// Insert a new document. Returns the create response body: `{id, ...shaped}`.
    pub async fn create(&self, principal: Option<&Principal>, input: Value) -> Result<Map<String, Value>, AppError> {
        let mut doc = into_object(input)?;
        strip(&mut doc, PROTECTED_FIELDS);
        if let Some(v) = &self.config.create_validator {
            check(v.validate(&doc, principal))?;
        }
        if let Some(field) = &self.config.ownership_field {
            let owner = principal.ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
            doc.insert(field.clone(), Value::String(owner.id.clone()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Value::String(now());
        doc.insert(ID.into(), Value::String(id.clone()));
        doc.insert(CREATED_AT.into(), now.clone());
        doc.insert(UPDATED_AT.into(), now);
        if let Some(p) = principal {
            doc.insert(CREATED_BY.into(), Value::String(p.id.clone()));
            doc.insert(UPDATED_BY.into(), Value::String(p.id.clone()));
        }

        self.store.insert(&self.config.collection, doc.clone()).await?;
        tracing::info!(collection = %self.config.collection, id = %id, "created");

        let mut body = Map::new();
        if let Some(shaper) = &self.config.create_shaper {
            body.extend(shaper.shape(&doc));
        }
        body.insert(ID.into(), Value::String(id));
        Ok(body)
    }

    /// One page of matching documents plus pagination metadata.
    pub async fn list(
        &self,
        principal: Option<&Principal>,
        params: &ListParams,
    ) -> Result<(Vec<Value>, PageInfo), AppError> {
        let page = PageRequest::parse(
            params.get("page").map(String::as_str),
            params.get("limit").map(String::as_str),
            self.config.default_limit,
            self.config.max_limit,
        );

        let mut filter = Filter::new();
        if let Some(scope) = self.owner_scope(principal, Access::Read)? {
            filter.push(scope);
        }
        let include_deleted = params
            .get("includeDeleted")
            .map(|v| matches!(v.trim(), "true" | "1"))
            .unwrap_or(false);
        if self.config.delete_mode == DeleteMode::Soft && !include_deleted {
            filter.push(Condition::IsNull(DELETED_AT.into()));
        }
        if let Some(term) = params.get("search").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if !self.config.searchable_fields.is_empty() {
                filter.push(Condition::Any(
                    self.config
                        .searchable_fields
                        .iter()
                        .map(|f| Condition::Contains(f.clone(), term.to_string()))
                        .collect(),
                ));
            }
        }
        if let Some(augmenter) = &self.config.query_augmenter {
            augmenter.augment(params, &mut filter)?;
        }

        let sort = match params.get("sort").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(raw) => Sort::parse_list(raw)
                .map_err(|field| AppError::Validation(format!("invalid sort field '{}'", field)))?,
            None => self.config.default_sort.clone(),
        };

        let total = self.store.count(&self.config.collection, &filter).await?;
        let opts = FindOptions {
            sort,
            skip: page.skip(),
            limit: Some(page.limit),
            populate: self.config.populate.clone(),
        };
        let docs = self.store.find(&self.config.collection, &filter, &opts).await?;
        tracing::debug!(collection = %self.config.collection, total, returned = docs.len(), "listed");
        Ok((docs, page.info(total)))
    }

    pub async fn get(&self, principal: Option<&Principal>, id: &str) -> Result<Value, AppError> {
        let id = self.parse_id(id)?;
        let mut filter = Filter::by_id(&id);
        if let Some(scope) = self.owner_scope(principal, Access::Read)? {
            filter.push(scope);
        }
        if self.config.delete_mode == DeleteMode::Soft {
            filter.push(Condition::IsNull(DELETED_AT.into()));
        }
        let opts = FindOptions {
            populate: self.config.populate.clone(),
            ..FindOptions::default()
        };
        self.store
            .find_one(&self.config.collection, &filter, &opts)
            .await?
            .ok_or_else(|| self.not_found())
    }

    /// Partial merge of `input` into the document.
    pub async fn update(&self, principal: Option<&Principal>, id: &str, input: Value) -> Result<(), AppError> {
        let id = self.parse_id(id)?;
        let mut set = into_object(input)?;
        strip(&mut set, PROTECTED_FIELDS);
        if let Some(owner) = &self.config.ownership_field {
            set.remove(owner);
        }
        let filter = self.write_filter(principal, &id)?;
        if let Some(v) = &self.config.update_validator {
            check(v.validate(&set, principal))?;
        }
        stamp_update(&mut set, principal);

        let matched = self
            .store
            .update_one(&self.config.collection, &filter, set, &[])
            .await?;
        if matched == 0 {
            return Err(self.not_found());
        }
        tracing::info!(collection = %self.config.collection, id = %id, "updated");
        Ok(())
    }

    pub async fn delete(&self, principal: Option<&Principal>, id: &str) -> Result<(), AppError> {
        let id = self.parse_id(id)?;
        let filter = self.write_filter(principal, &id)?;
        let affected = match self.config.delete_mode {
            DeleteMode::Soft => {
                let mut set = Map::new();
                set.insert(DELETED_AT.into(), Value::String(now()));
                set.insert(
                    DELETED_BY.into(),
                    principal.map(|p| Value::String(p.id.clone())).unwrap_or(Value::Null),
                );
                stamp_update(&mut set, principal);
                self.store
                    .update_one(&self.config.collection, &filter, set, &[])
                    .await?
            }
            DeleteMode::Hard => self.store.delete_one(&self.config.collection, &filter).await?,
        };
        if affected == 0 {
            return Err(self.not_found());
        }
        tracing::info!(collection = %self.config.collection, id = %id, mode = ?self.config.delete_mode, "deleted");
        Ok(())
    }

    pub async fn restore(&self, principal: Option<&Principal>, id: &str) -> Result<(), AppError> {
        if self.config.delete_mode != DeleteMode::Soft {
            return Err(AppError::Configuration(format!(
                "Restore is not enabled for {}",
                self.config.collection
            )));
        }
        let id = self.parse_id(id)?;
        let mut filter = Filter::by_id(&id);
        if let Some(scope) = self.owner_scope(principal, Access::Write)? {
            filter.push(scope);
        }
        filter.push(Condition::NotNull(DELETED_AT.into()));

        let mut set = Map::new();
        stamp_update(&mut set, principal);
        let unset = [DELETED_AT.to_string(), DELETED_BY.to_string()];
        let matched = self
            .store
            .update_one(&self.config.collection, &filter, set, &unset)
            .await?;
        if matched == 0 {
            return Err(AppError::NotFound(format!("Deleted {}", self.config.display_name)));
        }
        tracing::info!(collection = %self.config.collection, id = %id, "restored");
        Ok(())
    }

    /// Ownership condition for the operation. Mutations always scope; reads skip when public.
    fn owner_scope(&self, principal: Option<&Principal>, access: Access) -> Result<Option<Condition>, AppError> {
        let Some(field) = &self.config.ownership_field else {
            return Ok(None);
        };
        if access == Access::Read && self.config.allow_public_read {
            return Ok(None);
        }
        let principal = principal.ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
        Ok(Some(Condition::Eq(field.clone(), Value::String(principal.id.clone()))))
    }

    /// Id + owner + not-deleted: the target of update and delete.
    fn write_filter(&self, principal: Option<&Principal>, id: &str) -> Result<Filter, AppError> {
        let mut filter = Filter::by_id(id);
        if let Some(scope) = self.owner_scope(principal, Access::Write)? {
            filter.push(scope);
        }
        if self.config.delete_mode == DeleteMode::Soft {
            filter.push(Condition::IsNull(DELETED_AT.into()));
        }
        Ok(filter)
    }

    fn parse_id(&self, raw: &str) -> Result<String, AppError> {
        uuid::Uuid::parse_str(raw.trim())
            .map(|u| u.to_string())
            .map_err(|_| AppError::BadRequest(format!("Invalid {} id", self.config.display_name)))
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(self.config.display_name.clone())
    }
}

fn now() -> String {
    format_timestamp(Utc::now())
}

fn into_object(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn strip(doc: &mut Map<String, Value>, fields: &[&str]) {
    for f in fields {
        doc.remove(*f);
    }
}

fn stamp_update(set: &mut Map<String, Value>, principal: Option<&Principal>) {
    set.insert(UPDATED_AT.into(), Value::String(now()));
    if let Some(p) = principal {
        set.insert(UPDATED_BY.into(), Value::String(p.id.clone()));
    }
}

fn check(verdict: Verdict) -> Result<(), AppError> {
    match verdict {
        Verdict::Valid => Ok(()),
        Verdict::Invalid(msg) => Err(AppError::Validation(msg)),
    }
}
