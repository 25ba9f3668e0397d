//! Diff-based batch updates over the store's bulk writer.
//!
//! Each document is copied, transformed, and compared field by field with the untouched
//! original; only changed fields are written, in groups no larger than the bulk-write cap.

use crate::config::CollectionConfig;
use crate::document::{FieldUpdate, Record, WriteOutcome};
use crate::errors::{DbError, JoinedErrors};
use crate::store::DocumentStore;
use crate::utils::logger::AUDIT_TARGET;
use bson::{Bson, Document as BsonDocument};
use std::time::Instant;

/// Outcome of a grouped bulk operation: what succeeded and everything that failed.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<WriteOutcome>,
    pub errors: Vec<DbError>,
    /// Number of groups submitted (or attempted).
    pub groups: usize,
    /// Documents left untouched because the transform changed nothing.
    pub skipped: usize,
}

impl BatchReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Successful outcomes plus the joined error, if anything failed.
    #[must_use]
    pub fn into_parts(self) -> (Vec<WriteOutcome>, Option<DbError>) {
        let err = (!self.errors.is_empty()).then(|| DbError::Joined(JoinedErrors(self.errors)));
        (self.outcomes, err)
    }

    /// # Errors
    /// Returns the joined error if any document or group failed.
    pub fn into_result(self) -> Result<Vec<WriteOutcome>, DbError> {
        match self.into_parts() {
            (_, Some(e)) => Err(e),
            (outcomes, None) => Ok(outcomes),
        }
    }

    fn absorb(&mut self, other: Self) {
        self.outcomes.extend(other.outcomes);
        self.errors.extend(other.errors);
        self.skipped += other.skipped;
    }
}

/// Field-level changes made by `transform` to a copy of `original`.
///
/// Changed fields carry their new value, fields the transform removed are set to null, and
/// fields it added are included. `id_field` is never part of the delta.
pub fn compute_delta<F>(original: &BsonDocument, transform: F, id_field: &str) -> Vec<FieldUpdate>
where
    F: FnOnce(BsonDocument) -> BsonDocument,
{
    // Bson clones are structural, so the transform cannot reach the baseline.
    let after = transform(original.clone());
    let mut delta = Vec::new();
    for (key, old) in original {
        if key == id_field {
            continue;
        }
        let new = after.get(key).unwrap_or(&Bson::Null);
        if new != old {
            delta.push(FieldUpdate::new(key.clone(), new.clone()));
        }
    }
    for (key, new) in &after {
        if key != id_field && !original.contains_key(key) {
            delta.push(FieldUpdate::new(key.clone(), new.clone()));
        }
    }
    delta
}

/// Applies `transform` to every document and writes the resulting deltas, stamped with the
/// modification time, in sequential groups.
///
/// A failing document or group does not stop the run; failures are collected in the report.
///
/// # Errors
/// `DbError::NothingToOperate` when `docs` is empty.
pub fn apply_batch<F>(
    store: &dyn DocumentStore,
    collection: &str,
    docs: &[Record],
    mut transform: F,
    config: &CollectionConfig,
) -> Result<BatchReport, DbError>
where
    F: FnMut(BsonDocument) -> BsonDocument,
{
    let start = Instant::now();
    let report = run_groups(docs, config, "no docs to batch", |group| {
        update_group(store, collection, group, &mut transform, config)
    })?;
    crate::dev6!(
        "{{\"bench\":\"batch\",\"op\":\"update\",\"collection\":\"{collection}\",\"duration_ms\":{},\"groups\":{},\"written\":{},\"skipped\":{},\"errors\":{}}}",
        start.elapsed().as_millis(),
        report.groups,
        report.outcomes.len(),
        report.skipped,
        report.errors.len()
    );
    Ok(report)
}

/// Deletes every document, or soft-deletes it by stamping the deletion and modification
/// times, in sequential groups.
///
/// # Errors
/// `DbError::NothingToOperate` when `docs` is empty.
pub fn apply_deletes(
    store: &dyn DocumentStore,
    collection: &str,
    docs: &[Record],
    soft: bool,
    config: &CollectionConfig,
) -> Result<BatchReport, DbError> {
    let start = Instant::now();
    let report = run_groups(docs, config, "no docs to delete", |group| {
        let mut out = BatchReport::default();
        let mut writer = store.bulk_writer();
        let mut queued = 0usize;
        for doc in group {
            let res = if soft {
                let now = Bson::DateTime(bson::DateTime::now());
                writer.update(
                    collection,
                    &doc.id,
                    vec![
                        FieldUpdate::new(config.deleted_at_field.clone(), now.clone()),
                        FieldUpdate::new(config.updated_at_field.clone(), now),
                    ],
                )
            } else {
                writer.delete(collection, &doc.id)
            };
            match res {
                Ok(_) => queued += 1,
                Err(e) => out.errors.push(e),
            }
        }
        if queued > 0 {
            collect_flush(writer.flush(), &mut out);
        }
        Ok(out)
    })?;
    log::info!(
        target: AUDIT_TARGET,
        "{} {} documents in {collection} ({} failed)",
        if soft { "soft-deleted" } else { "deleted" },
        report.outcomes.len(),
        report.errors.len()
    );
    crate::dev6!(
        "{{\"bench\":\"batch\",\"op\":\"delete\",\"collection\":\"{collection}\",\"duration_ms\":{},\"groups\":{},\"deleted\":{},\"soft\":{soft}}}",
        start.elapsed().as_millis(),
        report.groups,
        report.outcomes.len()
    );
    Ok(report)
}

fn run_groups<G>(
    docs: &[Record],
    config: &CollectionConfig,
    empty_msg: &'static str,
    mut per_group: G,
) -> Result<BatchReport, DbError>
where
    G: FnMut(&[Record]) -> Result<BatchReport, DbError>,
{
    if docs.is_empty() {
        return Err(DbError::NothingToOperate(empty_msg));
    }
    let mut report = BatchReport::default();
    for (idx, group) in docs.chunks(config.effective_batch_size()).enumerate() {
        report.groups += 1;
        match per_group(group) {
            Ok(g) => report.absorb(g),
            Err(e) => {
                log::warn!("batch group {idx} ({} docs) failed: {e}", group.len());
                report.errors.push(e);
            }
        }
    }
    Ok(report)
}

fn update_group<F>(
    store: &dyn DocumentStore,
    collection: &str,
    group: &[Record],
    transform: &mut F,
    config: &CollectionConfig,
) -> Result<BatchReport, DbError>
where
    F: FnMut(BsonDocument) -> BsonDocument,
{
    if group.is_empty() {
        return Err(DbError::NothingToOperate("no docs to batch"));
    }
    let mut out = BatchReport::default();
    let mut writer = store.bulk_writer();
    let mut queued = 0usize;
    for doc in group {
        let mut delta = compute_delta(&doc.data, &mut *transform, &config.id_field);
        if delta.is_empty() {
            out.skipped += 1;
            continue;
        }
        delta.retain(|u| u.path != config.updated_at_field);
        delta.push(FieldUpdate::new(
            config.updated_at_field.clone(),
            Bson::DateTime(bson::DateTime::now()),
        ));
        match writer.update(collection, &doc.id, delta) {
            Ok(_) => queued += 1,
            Err(e) => out.errors.push(e),
        }
    }
    if queued > 0 {
        collect_flush(writer.flush(), &mut out);
    }
    Ok(out)
}

fn collect_flush(flushed: Result<Vec<Result<WriteOutcome, DbError>>, DbError>, out: &mut BatchReport) {
    match flushed {
        Ok(results) => {
            for r in results {
                match r {
                    Ok(o) => out.outcomes.push(o),
                    Err(e) => out.errors.push(e),
                }
            }
        }
        Err(e) => out.errors.push(DbError::SubmissionFailed(e.to_string())),
    }
}
