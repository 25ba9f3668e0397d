use crate::config::CollectionConfig;
use crate::document::{DocumentRef, Record, WriteOutcome, doc_path, to_fields};
use crate::errors::DbError;
use crate::store::DocumentStore;
use crate::utils::logger::AUDIT_TARGET;
use bson::{Bson, Document as BsonDocument};
use serde::Serialize;
use std::sync::Arc;

/// One collection of the store, with audit-timestamp and soft-delete conventions.
///
/// Cheap to clone; the store handle is shared and never mutated by this type.
#[derive(Clone)]
pub struct Collection {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) path: String,
    pub(crate) config: Arc<CollectionConfig>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("path", &self.path).field("config", &self.config).finish()
    }
}

impl Collection {
    pub fn new(store: Arc<dyn DocumentStore>, path: impl Into<String>, config: Arc<CollectionConfig>) -> Self {
        Self { store, path: path.into(), config }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn add_doc_data(&self, data: BsonDocument, id_prefix: Option<&str>) -> Result<(DocumentRef, WriteOutcome), DbError> {
        self.add_doc(None, data, id_prefix)
    }

    /// Adds a document under a fresh identifier, optionally prefixed.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn add_doc(
        &self,
        uid: Option<&str>,
        data: BsonDocument,
        id_prefix: Option<&str>,
    ) -> Result<(DocumentRef, WriteOutcome), DbError> {
        let id = format!("{}{}", id_prefix.unwrap_or(""), self.store.new_doc_id(&self.path));
        self.add_doc_with_id(Some(&id), uid, data)
    }

    /// # Errors
    /// Returns an error if `value` is not a struct-like value or the write is rejected.
    pub fn add_serialized<T: Serialize>(&self, uid: Option<&str>, value: &T) -> Result<(DocumentRef, WriteOutcome), DbError> {
        self.add_doc(uid, to_fields(value)?, None)
    }

    /// Stores `data` with the managed fields stamped: owner, creation and modification
    /// times, a null deletion time and the identifier itself.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn add_doc_with_id(
        &self,
        id: Option<&str>,
        uid: Option<&str>,
        mut data: BsonDocument,
    ) -> Result<(DocumentRef, WriteOutcome), DbError> {
        let cfg = &self.config;
        if let Some(uid) = uid {
            data.insert(cfg.uid_field.clone(), uid);
        }
        let now = Bson::DateTime(bson::DateTime::now());
        data.insert(cfg.created_at_field.clone(), now.clone());
        data.insert(cfg.updated_at_field.clone(), now);
        data.insert(cfg.deleted_at_field.clone(), Bson::Null);
        let id = id.map_or_else(|| self.store.new_doc_id(&self.path), str::to_string);
        data.insert(cfg.id_field.clone(), id.clone());

        let outcome = self.store.set(&self.path, &id, data, false)?;
        Ok((DocumentRef { path: doc_path(&self.path, &id), id }, outcome))
    }

    /// # Errors
    /// `DbError::NoSuchDocument` when absent; other store errors unchanged.
    pub fn get_doc(&self, id: &str) -> Result<Record, DbError> {
        self.store.get(&self.path, id).map_err(|e| match e {
            DbError::NotFound(_) => DbError::NoSuchDocument(id.to_string()),
            other => other,
        })
    }

    /// Merges `data` into the document and refreshes its modification time.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn update_doc(&self, id: &str, mut data: BsonDocument) -> Result<WriteOutcome, DbError> {
        data.insert(self.config.updated_at_field.clone(), Bson::DateTime(bson::DateTime::now()));
        self.store.set(&self.path, id, data, true)
    }

    /// Soft delete stamps the deletion time; hard delete removes the document.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn delete_doc(&self, id: &str, soft: bool) -> Result<WriteOutcome, DbError> {
        log::info!(target: AUDIT_TARGET, "{} {}", if soft { "soft-delete" } else { "delete" }, doc_path(&self.path, id));
        if soft {
            let mut data = BsonDocument::new();
            data.insert(self.config.deleted_at_field.clone(), Bson::DateTime(bson::DateTime::now()));
            return self.update_doc(id, data);
        }
        self.store.delete(&self.path, id)
    }
}
