//! Backend-neutral filter, sort and find options.
//! Built by the controller, rendered to SQL by `sql::builder` and evaluated directly by `MemoryStore`.

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Field names reach SQL as string literals; keep them to plain identifiers.
pub fn is_valid_field(name: &str) -> bool {
    static FIELD: OnceLock<Option<Regex>> = OnceLock::new();
    FIELD
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").ok())
        .as_ref()
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    /// Field absent or JSON null.
    IsNull(String),
    NotNull(String),
    /// Case-insensitive substring match on a string field.
    Contains(String, String),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    /// At least one must hold. Empty = nothing matches.
    Any(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Condition::Eq(f, v) => field(doc, f).map(|x| json_eq(x, v)).unwrap_or(false),
            Condition::IsNull(f) => field(doc, f).map(Value::is_null).unwrap_or(true),
            Condition::NotNull(f) => field(doc, f).map(|x| !x.is_null()).unwrap_or(false),
            Condition::Contains(f, needle) => field(doc, f)
                .and_then(Value::as_str)
                .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Condition::Gt(f, v) => compare(doc, f, v) == Some(Ordering::Greater),
            Condition::Gte(f, v) => matches!(compare(doc, f, v), Some(Ordering::Greater | Ordering::Equal)),
            Condition::Lt(f, v) => compare(doc, f, v) == Some(Ordering::Less),
            Condition::Lte(f, v) => matches!(compare(doc, f, v), Some(Ordering::Less | Ordering::Equal)),
            Condition::In(f, values) => field(doc, f)
                .map(|x| values.iter().any(|v| json_eq(x, v)))
                .unwrap_or(false),
            Condition::Any(conds) => conds.iter().any(|c| c.matches(doc)),
        }
    }
}

/// Conjunction of conditions. Empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.push(condition);
        self
    }

    pub fn by_id(id: &str) -> Self {
        Filter::new().and(Condition::Eq("id".into(), Value::String(id.to_string())))
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Sort { field: field.into(), direction: Direction::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Sort { field: field.into(), direction: Direction::Desc }
    }

    /// Parse `name,-createdAt` style sort expressions. Returns the first bad field on failure.
    pub fn parse_list(raw: &str) -> Result<Vec<Sort>, String> {
        let mut out = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (field, direction) = match part.strip_prefix('-') {
                Some(f) => (f, Direction::Desc),
                None => (part.strip_prefix('+').unwrap_or(part), Direction::Asc),
            };
            if !is_valid_field(field) {
                return Err(field.to_string());
            }
            out.push(Sort { field: field.to_string(), direction });
        }
        Ok(out)
    }
}

/// A single-reference expansion: replace `doc[field]` (an id) with the referenced document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Populate {
    pub field: String,
    pub collection: String,
}

impl Populate {
    pub fn new(field: impl Into<String>, collection: impl Into<String>) -> Self {
        Populate { field: field.into(), collection: collection.into() }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub sort: Vec<Sort>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub populate: Vec<Populate>,
}

fn field<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
    doc.as_object().and_then(|m| m.get(name))
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn compare(doc: &Value, name: &str, v: &Value) -> Option<Ordering> {
    compare_values(field(doc, name)?, v)
}

/// Ordering between two JSON values of the same kind; mixed kinds are unordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64()?.partial_cmp(&m.as_f64()?),
        (Value::String(s), Value::String(t)) => Some(s.cmp(t)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contains_is_case_insensitive() {
        let doc = json!({"name": "Acme Corp"});
        assert!(Condition::Contains("name".into(), "acme".into()).matches(&doc));
        assert!(Condition::Contains("name".into(), "CORP".into()).matches(&doc));
        assert!(!Condition::Contains("name".into(), "ltd".into()).matches(&doc));
        assert!(!Condition::Contains("missing".into(), "a".into()).matches(&doc));
    }

    #[test]
    fn is_null_covers_absent_and_null() {
        assert!(Condition::IsNull("deletedAt".into()).matches(&json!({})));
        assert!(Condition::IsNull("deletedAt".into()).matches(&json!({"deletedAt": null})));
        assert!(!Condition::IsNull("deletedAt".into()).matches(&json!({"deletedAt": "2024-01-01"})));
        assert!(Condition::NotNull("deletedAt".into()).matches(&json!({"deletedAt": "2024-01-01"})));
    }

    #[test]
    fn range_conditions_compare_same_kinds() {
        let doc = json!({"amount": 50, "date": "2024-03-01T00:00:00Z"});
        assert!(Condition::Gte("amount".into(), json!(50)).matches(&doc));
        assert!(!Condition::Gt("amount".into(), json!(50)).matches(&doc));
        assert!(Condition::Lt("date".into(), json!("2024-04-01")).matches(&doc));
        assert!(!Condition::Lt("amount".into(), json!("100")).matches(&doc));
    }

    #[test]
    fn empty_any_matches_nothing() {
        assert!(!Condition::Any(vec![]).matches(&json!({"a": 1})));
        assert!(Filter::new().matches(&json!({"a": 1})));
    }

    #[test]
    fn parse_sort_list() {
        let sorts = Sort::parse_list("name, -createdAt").unwrap();
        assert_eq!(sorts, vec![Sort::asc("name"), Sort::desc("createdAt")]);
        assert_eq!(Sort::parse_list("name;drop").unwrap_err(), "name;drop");
    }
}
