//! Condition compiler, diff-based batch updater and collection facade over a
//! document-database client.
//!
//! Callers describe queries as clause sequences (`[field, op, value]` filters plus an optional
//! trailing options mapping), and [`Collection`] turns them into store queries, pages, counts
//! and grouped bulk writes. The store itself sits behind [`store::DocumentStore`].

pub mod batch;
pub mod collection;
pub mod config;
pub mod document;
pub mod errors;
pub mod query;
pub mod store;
pub mod utils;

pub use batch::BatchReport;
pub use collection::{Collection, Page, PageParams};
pub use config::CollectionConfig;
pub use document::{DocumentRef, FieldUpdate, Record, WriteOutcome};
pub use errors::{DbError, JoinedErrors};
pub use query::{Clause, Direction, FieldFilter, FilterOp, OrderBy, Query, QueryOptions};
pub use store::{BulkWriter, DocumentStore, MemoryStore};

/// Installs logging from the `NEXUSDOC_LOG_*` environment variables.
///
/// # Errors
/// Returns an error if the log directory or files cannot be created, or a logger is already
/// installed.
pub fn init() -> Result<(), DbError> {
    utils::logger::configure_from_env().map(drop)
}
