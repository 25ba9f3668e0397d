use super::core::Collection;
use super::page::{self, Page};
use crate::batch::{self, BatchReport};
use crate::document::Record;
use crate::errors::DbError;
use crate::query::{Clause, Query, compile, split_options, with_options};
use bson::Document as BsonDocument;

impl Collection {
    /// # Errors
    /// Returns `DbError::InvalidClause` for an options clause that is not last.
    pub fn make_query(&self, clauses: &[Clause]) -> Result<Query, DbError> {
        compile(&self.path, clauses, &self.config)
    }

    /// # Errors
    /// Compile errors and store query errors, unchanged.
    pub fn list_docs(&self, clauses: &[Clause]) -> Result<Vec<Record>, DbError> {
        let query = self.make_query(clauses)?;
        self.store.run_query(&query)
    }

    /// First matching document, `None` when nothing matches.
    ///
    /// # Errors
    /// Compile errors and store query errors, unchanged.
    pub fn find_doc(&self, clauses: &[Clause]) -> Result<Option<Record>, DbError> {
        let clauses = with_options(clauses, |o| o.limit = Some(1));
        Ok(self.list_docs(&clauses)?.into_iter().next())
    }

    /// # Errors
    /// Compile errors and store query errors, unchanged.
    pub fn check_exists(&self, clauses: &[Clause]) -> Result<bool, DbError> {
        Ok(!self.list_docs(clauses)?.is_empty())
    }

    /// Number of documents matching the filters; a trailing options clause is ignored.
    ///
    /// # Errors
    /// Compile errors and store query errors, unchanged.
    pub fn count_docs(&self, clauses: &[Clause]) -> Result<u64, DbError> {
        let (filters, _) = split_options(clauses);
        let query = self.make_query(filters)?;
        self.store.count(&query)
    }

    /// One page of matches. The page's limit and offset override any in the trailing
    /// options clause; ordering and cursors there are kept.
    ///
    /// # Errors
    /// Compile errors and store query errors, unchanged.
    pub fn paginate(&self, clauses: &[Clause], page: u32, per_page: u32) -> Result<Page, DbError> {
        let (page, per_page) = page::resolve(page, per_page, &self.config);
        let clauses = with_options(clauses, |o| {
            o.limit = Some(i64::from(per_page));
            o.offset = Some(page::offset_for(page, per_page));
        });
        let docs = self.list_docs(&clauses)?;
        Ok(Page { docs, page, per_page, count: None, total_page: None })
    }

    /// [`Collection::paginate`] plus the total match count and page count.
    ///
    /// # Errors
    /// Compile errors and store query errors, unchanged.
    pub fn paginate_with_count(&self, clauses: &[Clause], page: u32, per_page: u32) -> Result<Page, DbError> {
        let mut out = self.paginate(clauses, page, per_page)?;
        let count = self.count_docs(clauses)?;
        out.count = Some(count);
        out.total_page = Some(page::total_pages(count, out.per_page));
        Ok(out)
    }

    /// Applies `transform` to every matching document and writes back only what changed.
    ///
    /// # Errors
    /// `DbError::NothingToOperate` when nothing matches; compile and query errors unchanged.
    /// Write failures are reported inside the returned [`BatchReport`].
    pub fn batch_docs<F>(&self, clauses: &[Clause], transform: F) -> Result<BatchReport, DbError>
    where
        F: FnMut(BsonDocument) -> BsonDocument,
    {
        let docs = self.list_docs(clauses)?;
        if docs.is_empty() {
            return Err(DbError::NothingToOperate("no docs to batch"));
        }
        let report = batch::apply_batch(self.store.as_ref(), &self.path, &docs, transform, &self.config)?;
        if !report.is_ok() {
            log::warn!("batch on {}: {} of {} writes failed", self.path, report.errors.len(), docs.len() - report.skipped);
        }
        Ok(report)
    }

    /// Deletes (or soft-deletes) every matching document.
    ///
    /// # Errors
    /// `DbError::NothingToOperate` when nothing matches; compile and query errors unchanged.
    pub fn delete_docs(&self, clauses: &[Clause], soft: bool) -> Result<BatchReport, DbError> {
        let docs = self.list_docs(clauses)?;
        batch::apply_deletes(self.store.as_ref(), &self.path, &docs, soft, &self.config)
    }
}
