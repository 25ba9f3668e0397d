use crate::document::{json_object_to_document, json_to_bson};
use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};
use serde_json::Value;

use super::types::{Clause, Direction, FieldFilter, OrderBy, QueryOptions};

/// Parses `field:direction`. A missing or unknown direction means ascending; an empty
/// field yields `None`.
#[must_use]
pub fn parse_order_by(spec: &str) -> Option<OrderBy> {
    if spec.is_empty() {
        return None;
    }
    let mut parts = spec.splitn(2, ':');
    let field = parts.next().unwrap_or("").trim();
    if field.is_empty() {
        return None;
    }
    let direction = match parts.next().map(|d| d.trim().to_ascii_lowercase()) {
        Some(d) if d == "desc" => Direction::Desc,
        _ => Direction::Asc,
    };
    Some(OrderBy { field: field.to_string(), direction })
}

/// One `==` filter per entry of `mapping`, in the mapping's iteration order.
pub fn equality_clauses(mapping: BsonDocument) -> impl Iterator<Item = Clause> {
    mapping.into_iter().map(|(k, v)| Clause::Filter(FieldFilter::eq(k, v)))
}

/// Reads the recognized modifier keys of a trailing options mapping.
///
/// Keys are matched case-insensitively; unknown keys are ignored.
///
/// # Errors
/// Returns an error if `limit` or `offset` is not an integer.
pub fn options_from_document(mapping: &BsonDocument) -> Result<QueryOptions, DbError> {
    let mut opts = QueryOptions::default();
    for (key, val) in mapping {
        match key.to_ascii_lowercase().as_str() {
            "orderby" => match val {
                Bson::String(s) => opts.order_by.extend(parse_order_by(s)),
                Bson::Array(items) => {
                    for item in items {
                        if let Bson::String(s) = item {
                            opts.order_by.extend(parse_order_by(s));
                        }
                    }
                }
                _ => {}
            },
            "limit" => opts.limit = Some(as_integer(key, val)?),
            "offset" => opts.offset = Some(as_integer(key, val)?),
            "startat" => opts.start_at = Some(val.clone()),
            "startafter" => opts.start_after = Some(val.clone()),
            "endat" => opts.end_at = Some(val.clone()),
            "endbefore" => opts.end_before = Some(val.clone()),
            _ => {}
        }
    }
    Ok(opts)
}

#[allow(clippy::cast_possible_truncation)]
fn as_integer(key: &str, v: &Bson) -> Result<i64, DbError> {
    match v {
        Bson::Int32(i) => Ok(i64::from(*i)),
        Bson::Int64(i) => Ok(*i),
        Bson::Double(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
        other => Err(DbError::InvalidClause(format!("{key} must be an integer, got {other}"))),
    }
}

/// Builds typed clauses from a loosely-typed condition sequence.
///
/// - `[field, op, value]` becomes a filter;
/// - an object in the last position becomes the options clause;
/// - an object anywhere else becomes one `==` filter per entry, recognized option keys
///   included (a `limit` key there filters on a field named `limit`).
///
/// # Errors
/// Returns `DbError::InvalidClause` for any other element shape.
pub fn parse_conditions(values: Vec<Value>) -> Result<Vec<Clause>, DbError> {
    let last = values.len().saturating_sub(1);
    let mut out = Vec::with_capacity(values.len());
    for (idx, v) in values.into_iter().enumerate() {
        match v {
            Value::Array(parts) => out.push(filter_from_parts(idx, parts)?),
            Value::Object(m) => {
                let mapping = json_object_to_document(m);
                if idx == last {
                    out.push(Clause::Options(options_from_document(&mapping)?));
                } else {
                    out.extend(equality_clauses(mapping));
                }
            }
            other => {
                return Err(DbError::InvalidClause(format!(
                    "clause {idx} is neither a [field, op, value] triple nor a mapping: {other}"
                )));
            }
        }
    }
    Ok(out)
}

fn filter_from_parts(idx: usize, parts: Vec<Value>) -> Result<Clause, DbError> {
    let [field, op, value]: [Value; 3] = parts.try_into().map_err(|p: Vec<Value>| {
        DbError::InvalidClause(format!("clause {idx} has {} elements, expected 3", p.len()))
    })?;
    match (field, op) {
        (Value::String(field), Value::String(op)) => {
            Ok(Clause::filter(field, &op, json_to_bson(value)))
        }
        _ => Err(DbError::InvalidClause(format!("clause {idx}: field and operator must be strings"))),
    }
}

/// # Errors
/// Returns an error if the text is not a JSON array of well-formed clauses.
pub fn parse_conditions_json(json: &str) -> Result<Vec<Clause>, DbError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(values) => parse_conditions(values),
        other => Err(DbError::InvalidClause(format!("conditions must be an array, got {other}"))),
    }
}
