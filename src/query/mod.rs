// Condition compiler: loose condition sequences -> typed clauses -> store queries.
mod compile;
mod eval;
mod parse;
mod types;

pub use compile::{compile, split_options, with_options};
pub use eval::{compare_bson, compare_docs, eval_filter, get_path};
pub(crate) use eval::apply_direction;
pub use parse::{
    equality_clauses, options_from_document, parse_conditions, parse_conditions_json,
    parse_order_by,
};
pub use types::{Clause, Direction, FieldFilter, FilterOp, OrderBy, Query, QueryOptions};
