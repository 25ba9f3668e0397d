use crate::config::CollectionConfig;
use crate::errors::DbError;

use super::types::{Clause, Query, QueryOptions};

/// Compiles a condition sequence into a query over `collection`.
///
/// Filters and order-by entries keep input order. Operators are not checked here.
///
/// # Errors
/// Returns `DbError::InvalidClause` if an options clause is not the last element.
pub fn compile(
    collection: &str,
    clauses: &[Clause],
    config: &CollectionConfig,
) -> Result<Query, DbError> {
    let mut query = Query::new(collection);
    if config.debug {
        crate::dev6!("{{\"compile\":\"{collection}\",\"clauses\":{}}}", clauses.len());
    }
    let last = clauses.len().saturating_sub(1);
    for (idx, clause) in clauses.iter().enumerate() {
        if config.debug {
            crate::dev6!("{clause:?}");
        }
        match clause {
            Clause::Filter(f) => query = query.where_field(f.clone()),
            Clause::Options(opts) if idx == last => query = apply_options(query, opts),
            Clause::Options(_) => {
                return Err(DbError::InvalidClause(format!(
                    "options clause at position {idx} must be last (of {})",
                    clauses.len()
                )));
            }
        }
    }
    if config.debug {
        crate::dev6!("--------------------");
    }
    Ok(query)
}

fn apply_options(mut query: Query, opts: &QueryOptions) -> Query {
    for ob in &opts.order_by {
        query = query.order_by(ob.field.clone(), ob.direction);
    }
    if let Some(n) = opts.limit {
        query = query.limit(n);
    }
    if let Some(n) = opts.offset {
        query = query.offset(n);
    }
    if let Some(c) = &opts.start_at {
        query = query.start_at(c.clone());
    }
    if let Some(c) = &opts.start_after {
        query = query.start_after(c.clone());
    }
    if let Some(c) = &opts.end_at {
        query = query.end_at(c.clone());
    }
    if let Some(c) = &opts.end_before {
        query = query.end_before(c.clone());
    }
    query
}

/// Splits off a trailing options clause, if any.
#[must_use]
pub fn split_options(clauses: &[Clause]) -> (&[Clause], Option<&QueryOptions>) {
    match clauses.split_last() {
        Some((Clause::Options(opts), rest)) => (rest, Some(opts)),
        _ => (clauses, None),
    }
}

/// Returns `clauses` with `merge` applied to the trailing options clause, appending a
/// default one first when the sequence has none.
#[must_use]
pub fn with_options(clauses: &[Clause], merge: impl FnOnce(&mut QueryOptions)) -> Vec<Clause> {
    let (filters, opts) = split_options(clauses);
    let mut opts = opts.cloned().unwrap_or_default();
    merge(&mut opts);
    let mut out = filters.to_vec();
    out.push(Clause::Options(opts));
    out
}
