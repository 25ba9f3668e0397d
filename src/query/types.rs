use bson::Bson;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a filter clause.
///
/// Symbols the compiler does not know are kept verbatim in `Other`; whether they are
/// legal is decided when the query runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
    Other(String),
}

impl FilterOp {
    #[must_use]
    pub fn parse(symbol: &str) -> Self {
        match symbol {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "array-contains" => Self::ArrayContains,
            "array-contains-any" => Self::ArrayContainsAny,
            "in" => Self::In,
            "not-in" => Self::NotIn,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::ArrayContains => "array-contains",
            Self::ArrayContainsAny => "array-contains-any",
            Self::In => "in",
            Self::NotIn => "not-in",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Bson,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: &str, value: impl Into<Bson>) -> Self {
        Self { field: field.into(), op: FilterOp::parse(op), value: value.into() }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self { field: field.into(), op: FilterOp::Eq, value: value.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Modifiers carried by a trailing options clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub order_by: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub start_at: Option<Bson>,
    pub start_after: Option<Bson>,
    pub end_at: Option<Bson>,
    pub end_before: Option<Bson>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    #[must_use]
    pub fn with_order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy { field: field.into(), direction });
        self
    }
}

/// One element of a condition sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Filter(FieldFilter),
    /// Only legal as the last clause.
    Options(QueryOptions),
}

impl Clause {
    pub fn filter(field: impl Into<String>, op: &str, value: impl Into<Bson>) -> Self {
        Self::Filter(FieldFilter::new(field, op, value))
    }

    #[must_use]
    pub const fn is_options(&self) -> bool {
        matches!(self, Self::Options(_))
    }
}

/// Compiled query, the shape handed to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub start_at: Option<Bson>,
    pub start_after: Option<Bson>,
    pub end_at: Option<Bson>,
    pub end_before: Option<Bson>,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self { collection: collection.into(), ..Self::default() }
    }

    #[must_use]
    pub fn where_field(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy { field: field.into(), direction });
        self
    }

    #[must_use]
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    #[must_use]
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    #[must_use]
    pub fn start_at(mut self, cursor: Bson) -> Self {
        self.start_at = Some(cursor);
        self
    }

    #[must_use]
    pub fn start_after(mut self, cursor: Bson) -> Self {
        self.start_after = Some(cursor);
        self
    }

    #[must_use]
    pub fn end_at(mut self, cursor: Bson) -> Self {
        self.end_at = Some(cursor);
        self
    }

    #[must_use]
    pub fn end_before(mut self, cursor: Bson) -> Self {
        self.end_before = Some(cursor);
        self
    }

    /// Same filters, no ordering, limit, offset or cursors.
    #[must_use]
    pub fn without_modifiers(&self) -> Self {
        Self { collection: self.collection.clone(), filters: self.filters.clone(), ..Self::default() }
    }
}
