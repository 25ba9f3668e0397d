// Shared fixtures for the integration suites.
#![allow(dead_code)]

use bson::{Document as BsonDocument, doc};
use nexusdoc::document::{DocumentId, FieldUpdate, Record, WriteOutcome};
use nexusdoc::store::JobId;
use nexusdoc::{BulkWriter, Collection, CollectionConfig, DbError, DocumentStore, MemoryStore, Query};
use parking_lot::Mutex;
use std::sync::Arc;

/// Store wrapper that records every bulk flush and can fail chosen ones wholesale.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    /// Jobs submitted per flush, in flush order (failed flushes included).
    pub flushes: Mutex<Vec<usize>>,
    /// Zero-based flush indices that fail before anything is applied.
    pub fail_flushes: Vec<usize>,
}

impl RecordingStore {
    pub fn failing(fail_flushes: Vec<usize>) -> Self {
        Self { fail_flushes, ..Self::default() }
    }

    pub fn flush_sizes(&self) -> Vec<usize> {
        self.flushes.lock().clone()
    }

    pub fn jobs_submitted(&self) -> usize {
        self.flushes.lock().iter().sum()
    }
}

struct RecordingWriter<'a> {
    owner: &'a RecordingStore,
    inner: Box<dyn BulkWriter + 'a>,
    queued: usize,
}

impl BulkWriter for RecordingWriter<'_> {
    fn update(&mut self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<JobId, DbError> {
        let job = self.inner.update(collection, id, updates)?;
        self.queued += 1;
        Ok(job)
    }

    fn delete(&mut self, collection: &str, id: &str) -> Result<JobId, DbError> {
        let job = self.inner.delete(collection, id)?;
        self.queued += 1;
        Ok(job)
    }

    fn flush(self: Box<Self>) -> Result<Vec<Result<WriteOutcome, DbError>>, DbError> {
        let idx = {
            let mut flushes = self.owner.flushes.lock();
            flushes.push(self.queued);
            flushes.len() - 1
        };
        if self.owner.fail_flushes.contains(&idx) {
            return Err(DbError::WriteError(format!("injected failure on flush {idx}")));
        }
        self.inner.flush()
    }
}

impl DocumentStore for RecordingStore {
    fn new_doc_id(&self, collection: &str) -> DocumentId {
        self.inner.new_doc_id(collection)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Record, DbError> {
        self.inner.get(collection, id)
    }

    fn set(&self, collection: &str, id: &str, data: BsonDocument, merge: bool) -> Result<WriteOutcome, DbError> {
        self.inner.set(collection, id, data, merge)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<WriteOutcome, DbError> {
        self.inner.delete(collection, id)
    }

    fn run_query(&self, query: &Query) -> Result<Vec<Record>, DbError> {
        self.inner.run_query(query)
    }

    fn count(&self, query: &Query) -> Result<u64, DbError> {
        self.inner.count(query)
    }

    fn bulk_writer(&self) -> Box<dyn BulkWriter + '_> {
        Box::new(RecordingWriter { owner: self, inner: self.inner.bulk_writer(), queued: 0 })
    }
}

pub fn collection_on(store: Arc<dyn DocumentStore>, path: &str) -> Collection {
    Collection::new(store, path, Arc::new(CollectionConfig::default()))
}

/// `n` documents `{n, group: n % 3, tags: [..]}` with ids `d0000`, `d0001`, ...
pub fn seed(col: &Collection, n: i32) {
    for i in 0..n {
        let data = doc! {"n": i, "group": i % 3, "tags": [format!("t{}", i % 4)], "profile": {"score": i * 10}};
        col.add_doc_with_id(Some(&format!("d{i:04}")), None, data).unwrap();
    }
}
