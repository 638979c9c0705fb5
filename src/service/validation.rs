//! Validator strategy and the rule-driven validator built on it.

use crate::auth::Principal;
use crate::config::ValidationRule;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Outcome of a validator run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
}

/// Business-rule check run before create/update persistence.
pub trait Validator: Send + Sync {
    fn validate(&self, input: &Map<String, Value>, principal: Option<&Principal>) -> Verdict;
}

impl<F> Validator for F
where
    F: Fn(&Map<String, Value>, Option<&Principal>) -> Verdict + Send + Sync,
{
    fn validate(&self, input: &Map<String, Value>, principal: Option<&Principal>) -> Verdict {
        self(input, principal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RuleMode {
    /// Required fields must be present.
    Create,
    /// Only fields present in the body are checked.
    Update,
}

/// Validates a body against per-field rules.
#[derive(Clone, Debug)]
pub struct RuleValidator {
    rules: BTreeMap<String, ValidationRule>,
    mode: RuleMode,
}

impl RuleValidator {
    pub fn for_create(rules: impl IntoIterator<Item = (String, ValidationRule)>) -> Self {
        RuleValidator {
            rules: rules.into_iter().collect(),
            mode: RuleMode::Create,
        }
    }

    pub fn for_update(rules: impl IntoIterator<Item = (String, ValidationRule)>) -> Self {
        RuleValidator {
            rules: rules.into_iter().collect(),
            mode: RuleMode::Update,
        }
    }

    fn check(&self, body: &Map<String, Value>) -> Result<(), String> {
        for (col, rule) in &self.rules {
            let val = body.get(col);
            if self.mode == RuleMode::Create
                && rule.required == Some(true)
                && (val.is_none() || val == Some(&Value::Null))
            {
                return Err(format!("{} is required", col));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }
}

impl Validator for RuleValidator {
    fn validate(&self, input: &Map<String, Value>, _principal: Option<&Principal>) -> Verdict {
        match self.check(input) {
            Ok(()) => Verdict::Valid,
            Err(msg) => Verdict::Invalid(msg),
        }
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), String> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(format!("{} must be at most {} characters", col, max));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(format!("{} must be at least {} characters", col, min));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| format!("invalid pattern for {}", col))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(format!("{} does not match required pattern", col));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(format!(
                "{} must be one of: {:?}",
                col,
                allowed.iter().take(5).collect::<Vec<_>>()
            ));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < min {
                return Err(format!("{} must be at least {}", col, min));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = v.as_f64() {
            if n > max {
                return Err(format!("{} must be at most {}", col, max));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), String> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                let valid = s
                    .split_once('@')
                    .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
                    .unwrap_or(false);
                if !valid {
                    return Err(format!("{} must be a valid email", col));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(format!("{} must be a valid UUID", col));
                }
            }
        }
        _ => {}
    }
    Ok(())
}
