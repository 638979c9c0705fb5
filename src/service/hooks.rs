//! List-query augmentation and create-response shaping strategies.

use crate::error::AppError;
use crate::query::{Condition, Filter};
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Raw list query parameters.
pub type ListParams = HashMap<String, String>;

/// Refines the base list filter from request parameters (status filters, date ranges, ...).
pub trait QueryAugmenter: Send + Sync {
    fn augment(&self, params: &ListParams, filter: &mut Filter) -> Result<(), AppError>;
}

impl<F> QueryAugmenter for F
where
    F: Fn(&ListParams, &mut Filter) -> Result<(), AppError> + Send + Sync,
{
    fn augment(&self, params: &ListParams, filter: &mut Filter) -> Result<(), AppError> {
        self(params, filter)
    }
}

/// Adds fields to the create response beyond the new id.
pub trait CreateShaper: Send + Sync {
    fn shape(&self, created: &Map<String, Value>) -> Map<String, Value>;
}

impl<F> CreateShaper for F
where
    F: Fn(&Map<String, Value>) -> Map<String, Value> + Send + Sync,
{
    fn shape(&self, created: &Map<String, Value>) -> Map<String, Value> {
        self(created)
    }
}

/// Copies query parameters into equality conditions (`?status=paid` -> `status = "paid"`).
#[derive(Clone, Debug, Default)]
pub struct ExactMatch {
    /// (query parameter, document field)
    fields: Vec<(String, String)>,
}

impl ExactMatch {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExactMatch {
            fields: fields
                .into_iter()
                .map(|f| {
                    let f = f.into();
                    (f.clone(), f)
                })
                .collect(),
        }
    }

    /// Map a differently-named parameter onto a field.
    pub fn param(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.fields.push((param.into(), field.into()));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, f)| f.as_str())
    }
}

impl QueryAugmenter for ExactMatch {
    fn augment(&self, params: &ListParams, filter: &mut Filter) -> Result<(), AppError> {
        for (param, field) in &self.fields {
            if let Some(v) = params.get(param).map(|s| s.trim()).filter(|s| !s.is_empty()) {
                filter.push(Condition::Eq(field.clone(), Value::String(v.to_string())));
            }
        }
        Ok(())
    }
}

/// Bounds a timestamp field with `from` / `to` parameters (RFC 3339 or `YYYY-MM-DD`; `to` dates are inclusive).
#[derive(Clone, Debug)]
pub struct DateRange {
    field: String,
    from_param: String,
    to_param: String,
}

impl DateRange {
    pub fn new(field: impl Into<String>) -> Self {
        DateRange {
            field: field.into(),
            from_param: "from".into(),
            to_param: "to".into(),
        }
    }

    pub fn params(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from_param = from.into();
        self.to_param = to.into();
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Same rendering as the bookkeeping timestamps, so string comparison orders correctly.
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

enum Bound {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

fn parse_bound(param: &str, raw: &str) -> Result<Bound, AppError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Bound::Instant(t.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Bound::Day)
        .map_err(|_| AppError::Validation(format!("{} must be a date (YYYY-MM-DD) or RFC 3339 timestamp", param)))
}

fn day_start(d: NaiveDate) -> DateTime<Utc> {
    d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

impl QueryAugmenter for DateRange {
    fn augment(&self, params: &ListParams, filter: &mut Filter) -> Result<(), AppError> {
        let get = |p: &str| params.get(p).map(|s| s.trim()).filter(|s| !s.is_empty());
        if let Some(raw) = get(&self.from_param) {
            let start = match parse_bound(&self.from_param, raw)? {
                Bound::Instant(t) => t,
                Bound::Day(d) => day_start(d),
            };
            filter.push(Condition::Gte(self.field.clone(), Value::String(format_timestamp(start))));
        }
        if let Some(raw) = get(&self.to_param) {
            match parse_bound(&self.to_param, raw)? {
                Bound::Instant(t) => {
                    filter.push(Condition::Lte(self.field.clone(), Value::String(format_timestamp(t))))
                }
                Bound::Day(d) => {
                    let next = day_start(d) + Duration::days(1);
                    filter.push(Condition::Lt(self.field.clone(), Value::String(format_timestamp(next))))
                }
            }
        }
        Ok(())
    }
}

/// Runs several augmenters in order.
pub struct Chain(pub Vec<Box<dyn QueryAugmenter>>);

impl QueryAugmenter for Chain {
    fn augment(&self, params: &ListParams, filter: &mut Filter) -> Result<(), AppError> {
        for a in &self.0 {
            a.augment(params, filter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn exact_match_skips_blank_params() {
        let mut filter = Filter::new();
        ExactMatch::new(["status"])
            .param("customer", "customerId")
            .augment(&params(&[("status", "paid"), ("customer", " ")]), &mut filter)
            .unwrap();
        assert_eq!(
            filter.conditions,
            vec![Condition::Eq("status".into(), Value::String("paid".into()))]
        );
    }

    #[test]
    fn date_range_day_bounds_are_inclusive() {
        let mut filter = Filter::new();
        DateRange::new("issuedAt")
            .augment(&params(&[("from", "2024-03-01"), ("to", "2024-03-31")]), &mut filter)
            .unwrap();
        assert_eq!(
            filter.conditions,
            vec![
                Condition::Gte("issuedAt".into(), Value::String("2024-03-01T00:00:00.000Z".into())),
                Condition::Lt("issuedAt".into(), Value::String("2024-04-01T00:00:00.000Z".into())),
            ]
        );
    }

    #[test]
    fn date_range_rejects_garbage() {
        let mut filter = Filter::new();
        let err = DateRange::new("issuedAt")
            .augment(&params(&[("from", "last week")]), &mut filter)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn chain_runs_in_order() {
        let chain = Chain(vec![
            Box::new(ExactMatch::new(["status"])),
            Box::new(DateRange::new("createdAt")),
        ]);
        let mut filter = Filter::new();
        chain
            .augment(&params(&[("status", "open"), ("to", "2024-01-01T10:00:00Z")]), &mut filter)
            .unwrap();
        assert_eq!(filter.conditions.len(), 2);
        assert_eq!(
            filter.conditions[1],
            Condition::Lte("createdAt".into(), Value::String("2024-01-01T10:00:00.000Z".into()))
        );
    }
}
