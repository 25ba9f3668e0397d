//! The document-database client seam.
//!
//! Everything above this module (compiler, batch updater, collection facade) talks to the
//! database only through [`DocumentStore`] and [`BulkWriter`]. `MemoryStore` is the
//! in-process implementation used by tests and the CLI.

mod memory;

pub use memory::MemoryStore;

use crate::document::{DocumentId, FieldUpdate, Record, WriteOutcome};
use crate::errors::DbError;
use crate::query::Query;
use bson::Document as BsonDocument;

/// Position of a job inside one bulk submission.
pub type JobId = usize;

pub trait DocumentStore: Send + Sync {
    /// Fresh auto-generated identifier for a new document in `collection`.
    fn new_doc_id(&self, collection: &str) -> DocumentId;

    /// # Errors
    /// `DbError::NotFound` when the document does not exist.
    fn get(&self, collection: &str, id: &str) -> Result<Record, DbError>;

    /// Replaces the document, or merges top-level fields into it when `merge` is set.
    ///
    /// # Errors
    /// Returns an error if the write is rejected.
    fn set(
        &self,
        collection: &str,
        id: &str,
        data: BsonDocument,
        merge: bool,
    ) -> Result<WriteOutcome, DbError>;

    /// # Errors
    /// Returns an error if the delete is rejected. Deleting an absent document is not an error.
    fn delete(&self, collection: &str, id: &str) -> Result<WriteOutcome, DbError>;

    /// # Errors
    /// Returns an error if the query is invalid for the store (bad operator, bad limit, ...).
    fn run_query(&self, query: &Query) -> Result<Vec<Record>, DbError>;

    /// # Errors
    /// Same conditions as [`DocumentStore::run_query`].
    fn count(&self, query: &Query) -> Result<u64, DbError>;

    fn bulk_writer(&self) -> Box<dyn BulkWriter + '_>;
}

/// Batched submission of writes. Jobs are queued, then sent together by `flush`.
pub trait BulkWriter {
    /// # Errors
    /// Returns an error if the job cannot be queued; other jobs are unaffected.
    fn update(
        &mut self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<JobId, DbError>;

    /// # Errors
    /// Returns an error if the job cannot be queued.
    fn delete(&mut self, collection: &str, id: &str) -> Result<JobId, DbError>;

    /// Submits every queued job. The outer error means nothing was submitted; otherwise
    /// there is one result per queued job, in queue order.
    ///
    /// # Errors
    /// Returns an error if the submission as a whole fails.
    fn flush(self: Box<Self>) -> Result<Vec<Result<WriteOutcome, DbError>>, DbError>;
}
