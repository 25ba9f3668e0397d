use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use crate::errors::DbError;

use super::types::{Direction, FieldFilter, FilterOp, OrderBy};

pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 30;

/// Evaluates one filter against a document.
///
/// # Errors
/// Returns `DbError::QueryError` for unknown operators and for list operators whose value
/// is not an array.
pub fn eval_filter(doc: &BsonDocument, filter: &FieldFilter) -> Result<bool, DbError> {
    let v = get_path(doc, &filter.field);
    let target = &filter.value;
    Ok(match &filter.op {
        FilterOp::Eq => v.is_some_and(|v| values_equal(v, target)),
        FilterOp::Ne => v.is_some_and(|v| !values_equal(v, target)),
        FilterOp::Lt => v.is_some_and(|v| comparable(v, target) && compare_bson(v, target).is_lt()),
        FilterOp::Lte => v.is_some_and(|v| comparable(v, target) && compare_bson(v, target).is_le()),
        FilterOp::Gt => v.is_some_and(|v| comparable(v, target) && compare_bson(v, target).is_gt()),
        FilterOp::Gte => v.is_some_and(|v| comparable(v, target) && compare_bson(v, target).is_ge()),
        FilterOp::ArrayContains => match v {
            Some(Bson::Array(items)) => items.iter().any(|x| values_equal(x, target)),
            _ => false,
        },
        FilterOp::ArrayContainsAny => {
            let set = as_set(filter)?;
            match v {
                Some(Bson::Array(items)) => items.iter().any(|x| set.iter().any(|s| values_equal(x, s))),
                _ => false,
            }
        }
        FilterOp::In => {
            let set = as_set(filter)?;
            v.is_some_and(|v| set.iter().any(|s| values_equal(v, s)))
        }
        FilterOp::NotIn => {
            let set = as_set(filter)?;
            v.is_some_and(|v| !set.iter().any(|s| values_equal(v, s)))
        }
        FilterOp::Other(op) => {
            return Err(DbError::QueryError(format!("invalid operator {op:?} on field {}", filter.field)));
        }
    })
}

fn as_set(filter: &FieldFilter) -> Result<&[Bson], DbError> {
    match &filter.value {
        Bson::Array(items) if items.len() <= MAX_IN_SET => Ok(items),
        Bson::Array(items) => Err(DbError::QueryError(format!(
            "'{}' supports at most {MAX_IN_SET} values, got {}",
            filter.op,
            items.len()
        ))),
        other => Err(DbError::QueryError(format!(
            "'{}' on field {} requires an array value, got {other}",
            filter.op, filter.field
        ))),
    }
}

/// Dotted path lookup through nested documents.
pub fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut depth = 0usize;
    while let Some(part) = parts.next() {
        depth += 1;
        if depth > MAX_PATH_DEPTH {
            return None;
        }
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

#[allow(clippy::cast_precision_loss)]
fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        _ => f64::NAN,
    }
}

/// Range comparisons only match values of the same type class.
fn comparable(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b)
}

fn as_int(x: &Bson) -> Option<i64> {
    match x {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        _ => None,
    }
}

/// Integer pairs compare exactly; only a `Double` on either side goes through `f64`.
fn compare_num(a: &Bson, b: &Bson) -> Ordering {
    match (as_int(a), as_int(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => as_f64_num(a).total_cmp(&as_f64_num(b)),
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return match (as_int(a), as_int(b)) {
            (Some(x), Some(y)) => x == y,
            _ => as_f64_num(a) == as_f64_num(b),
        };
    }
    a == b
}

/// Total order over values: by type class first, then by value.
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_num(a) && is_num(b) {
        return compare_num(a, b);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::Array(x), Bson::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_bson(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null | Bson::Undefined => 0,
        Bson::Boolean(_) => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::DateTime(_) | Bson::Timestamp(_) => 3,
        Bson::String(_) | Bson::Symbol(_) => 4,
        Bson::Binary(_) => 5,
        Bson::ObjectId(_) => 6,
        Bson::Array(_) => 8,
        Bson::Document(_) => 9,
        _ => 10,
    }
}

/// Orders documents by the order-by list; missing fields sort first.
pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, order: &[OrderBy]) -> Ordering {
    for ob in order {
        let ord = match (get_path(a, &ob.field), get_path(b, &ob.field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return apply_direction(ord, ob.direction);
        }
    }
    Ordering::Equal
}

pub(crate) fn apply_direction(ord: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
    }
}
