use crate::document::{DocumentId, FieldUpdate, Record, WriteOutcome, doc_path, json_object_to_document};
use crate::errors::DbError;
use crate::query::{Direction, OrderBy, Query, apply_direction, compare_bson, compare_docs, eval_filter, get_path};
use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::{BulkWriter, DocumentStore, JobId};

type CollectionMap = BTreeMap<DocumentId, BsonDocument>;

/// Thread-safe in-process store with the query semantics of the managed database.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, CollectionMap>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `collection` with JSON objects. The identifier is taken from `id_field` when it
    /// holds a string, otherwise generated. Returns the number of documents stored.
    ///
    /// # Errors
    /// Returns an error if an element is not a JSON object.
    pub fn import(&self, collection: &str, id_field: &str, docs: Vec<Value>) -> Result<usize, DbError> {
        let mut parsed = Vec::with_capacity(docs.len());
        for (i, v) in docs.into_iter().enumerate() {
            let Value::Object(m) = v else {
                return Err(DbError::InvalidClause(format!("{collection}[{i}] is not an object")));
            };
            let data = json_object_to_document(m);
            let id = match data.get(id_field) {
                Some(Bson::String(s)) => s.clone(),
                _ => self.new_doc_id(collection),
            };
            parsed.push((id, data));
        }
        let n = parsed.len();
        let mut cols = self.collections.write();
        let col = cols.entry(collection.to_string()).or_default();
        col.extend(parsed);
        log::info!("imported {n} documents into {collection}");
        Ok(n)
    }

    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, BTreeMap::len)
    }

    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl DocumentStore for MemoryStore {
    fn new_doc_id(&self, _collection: &str) -> DocumentId {
        Uuid::new_v4().simple().to_string()
    }

    fn get(&self, collection: &str, id: &str) -> Result<Record, DbError> {
        self.collections
            .read()
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|d| Record::new(collection, id, d.clone()))
            .ok_or_else(|| DbError::NotFound(doc_path(collection, id)))
    }

    fn set(&self, collection: &str, id: &str, data: BsonDocument, merge: bool) -> Result<WriteOutcome, DbError> {
        let mut cols = self.collections.write();
        let col = cols.entry(collection.to_string()).or_default();
        match col.get_mut(id) {
            Some(existing) if merge => {
                for (k, v) in data {
                    existing.insert(k, v);
                }
            }
            _ => {
                col.insert(id.to_string(), data);
            }
        }
        Ok(WriteOutcome::now(doc_path(collection, id)))
    }

    fn delete(&self, collection: &str, id: &str) -> Result<WriteOutcome, DbError> {
        if let Some(col) = self.collections.write().get_mut(collection) {
            col.remove(id);
        }
        Ok(WriteOutcome::now(doc_path(collection, id)))
    }

    fn run_query(&self, query: &Query) -> Result<Vec<Record>, DbError> {
        validate(query)?;
        let cols = self.collections.read();
        let Some(col) = cols.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(&DocumentId, &BsonDocument)> = Vec::new();
        for (id, doc) in col {
            let mut keep = true;
            for f in &query.filters {
                if !eval_filter(doc, f)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                matched.push((id, doc));
            }
        }

        // Ties on the order-by list fall back to the document id.
        matched.sort_by(|(ia, a), (ib, b)| compare_docs(a, b, &query.order_by).then_with(|| ia.cmp(ib)));

        matched.retain(|(id, doc)| within_cursors(query, id, doc));

        let skip = query.offset.map_or(0, |n| usize::try_from(n).unwrap_or(0));
        let take = query.limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(0));
        Ok(matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(id, doc)| Record::new(&query.collection, id.clone(), doc.clone()))
            .collect())
    }

    fn count(&self, query: &Query) -> Result<u64, DbError> {
        Ok(self.run_query(query)?.len() as u64)
    }

    fn bulk_writer(&self) -> Box<dyn BulkWriter + '_> {
        Box::new(MemoryBulkWriter { store: self, jobs: Vec::new() })
    }
}

fn validate(query: &Query) -> Result<(), DbError> {
    if let Some(n) = query.limit
        && n < 0
    {
        return Err(DbError::QueryError(format!("limit must be non-negative, got {n}")));
    }
    if let Some(n) = query.offset
        && n < 0
    {
        return Err(DbError::QueryError(format!("offset must be non-negative, got {n}")));
    }
    // Operator/value errors do not depend on the document, so surface them even when
    // nothing would be scanned.
    let empty = BsonDocument::new();
    for f in &query.filters {
        eval_filter(&empty, f)?;
    }
    if query.order_by.is_empty() {
        for c in [&query.start_at, &query.start_after, &query.end_at, &query.end_before].into_iter().flatten() {
            if !matches!(c, Bson::String(_)) {
                return Err(DbError::QueryError(
                    "a cursor without orderBy must be a document id string".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Position of a document relative to a cursor in the query's sort order.
fn cursor_cmp(order: &[OrderBy], id: &str, doc: &BsonDocument, cursor: &Bson) -> Ordering {
    if order.is_empty() {
        return match cursor {
            Bson::String(c) => id.cmp(c.as_str()),
            _ => Ordering::Equal,
        };
    }
    let values: &[Bson] = match cursor {
        Bson::Array(vals) => vals,
        single => std::slice::from_ref(single),
    };
    for (ob, cv) in order.iter().zip(values) {
        let ord = compare_bson(get_path(doc, &ob.field).unwrap_or(&Bson::Null), cv);
        if ord != Ordering::Equal {
            return apply_direction(ord, ob.direction);
        }
    }
    Ordering::Equal
}

fn within_cursors(query: &Query, id: &str, doc: &BsonDocument) -> bool {
    let at = |c: &Option<Bson>| c.as_ref().map(|c| cursor_cmp(&query.order_by, id, doc, c));
    at(&query.start_at).is_none_or(Ordering::is_ge)
        && at(&query.start_after).is_none_or(Ordering::is_gt)
        && at(&query.end_at).is_none_or(Ordering::is_le)
        && at(&query.end_before).is_none_or(Ordering::is_lt)
}

enum Job {
    Update { collection: String, id: String, updates: Vec<FieldUpdate> },
    Delete { collection: String, id: String },
}

struct MemoryBulkWriter<'a> {
    store: &'a MemoryStore,
    jobs: Vec<Job>,
}

impl BulkWriter for MemoryBulkWriter<'_> {
    fn update(&mut self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<JobId, DbError> {
        if updates.is_empty() {
            return Err(DbError::WriteError(format!("empty update for {}", doc_path(collection, id))));
        }
        if let Some(bad) = updates.iter().find(|u| u.path.is_empty() || u.path.split('.').any(str::is_empty)) {
            return Err(DbError::WriteError(format!("invalid field path {:?}", bad.path)));
        }
        if let Some((i, dup)) = updates.iter().enumerate().find(|(i, u)| updates[..*i].iter().any(|p| p.path == u.path)) {
            return Err(DbError::WriteError(format!("field path {:?} repeated at {i}", dup.path)));
        }
        self.jobs.push(Job::Update { collection: collection.to_string(), id: id.to_string(), updates });
        Ok(self.jobs.len() - 1)
    }

    fn delete(&mut self, collection: &str, id: &str) -> Result<JobId, DbError> {
        self.jobs.push(Job::Delete { collection: collection.to_string(), id: id.to_string() });
        Ok(self.jobs.len() - 1)
    }

    fn flush(self: Box<Self>) -> Result<Vec<Result<WriteOutcome, DbError>>, DbError> {
        let mut cols = self.store.collections.write();
        let mut results = Vec::with_capacity(self.jobs.len());
        for job in self.jobs {
            results.push(match job {
                Job::Update { collection, id, updates } => {
                    match cols.get_mut(&collection).and_then(|c| c.get_mut(&id)) {
                        Some(doc) => {
                            for u in updates {
                                set_path(doc, &u.path, u.value);
                            }
                            Ok(WriteOutcome::now(doc_path(&collection, &id)))
                        }
                        None => Err(DbError::NotFound(doc_path(&collection, &id))),
                    }
                }
                Job::Delete { collection, id } => {
                    if let Some(c) = cols.get_mut(&collection) {
                        c.remove(&id);
                    }
                    Ok(WriteOutcome::now(doc_path(&collection, &id)))
                }
            });
        }
        Ok(results)
    }
}

/// Sets a dotted path, creating intermediate documents as needed.
fn set_path(root: &mut BsonDocument, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            root.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            if !matches!(root.get(head), Some(Bson::Document(_))) {
                root.insert(head.to_string(), Bson::Document(BsonDocument::new()));
            }
            if let Some(Bson::Document(child)) = root.get_mut(head) {
                set_path(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FieldFilter;
    use bson::doc;
    use serde_json::json;

    fn seeded() -> MemoryStore {
        let s = MemoryStore::new();
        s.import(
            "users",
            "id",
            vec![
                json!({"id": "a", "age": 30, "name": "alice"}),
                json!({"id": "b", "age": 40, "name": "bob"}),
                json!({"id": "c", "age": 35, "name": "carol"}),
                json!({"id": "d", "age": 35, "name": "dave"}),
            ],
        )
        .unwrap();
        s
    }

    fn names(rs: &[Record]) -> Vec<String> {
        rs.iter().map(|r| r.data.get_str("name").unwrap().to_string()).collect()
    }

    #[test]
    fn filter_order_offset_limit() {
        let s = seeded();
        let q = Query::new("users")
            .where_field(FieldFilter::new("age", ">=", 35))
            .order_by("age", Direction::Desc)
            .offset(1)
            .limit(1);
        assert_eq!(names(&s.run_query(&q).unwrap()), ["carol"]);
    }

    #[test]
    fn cursors_follow_order_tuple() {
        let s = seeded();
        let base = Query::new("users").order_by("age", Direction::Asc).order_by("name", Direction::Asc);
        let after = base.clone().start_after(bson::bson!([35, "carol"]));
        assert_eq!(names(&s.run_query(&after).unwrap()), ["dave", "bob"]);
        let until = base.clone().end_at(Bson::Int32(35));
        assert_eq!(names(&s.run_query(&until).unwrap()), ["alice", "carol", "dave"]);
        let before = base.end_before(Bson::Int32(35));
        assert_eq!(names(&s.run_query(&before).unwrap()), ["alice"]);
        let by_id = Query::new("users").start_at(Bson::String("c".into()));
        assert_eq!(names(&s.run_query(&by_id).unwrap()), ["carol", "dave"]);
    }

    #[test]
    fn single_field_array_cursor() {
        let s = seeded();
        let base = Query::new("users").order_by("age", Direction::Asc);
        let after = base.clone().start_after(bson::bson!([30]));
        assert_eq!(names(&s.run_query(&after).unwrap()), ["carol", "dave", "bob"]);
        let until = base.end_at(bson::bson!([35]));
        assert_eq!(names(&s.run_query(&until).unwrap()), ["alice", "carol", "dave"]);
    }

    #[test]
    fn large_int64_values_stay_distinct() {
        let s = MemoryStore::new();
        let two_53 = 1_i64 << 53;
        s.set("big", "a", doc! {"n": two_53 + 1}, false).unwrap();
        s.set("big", "b", doc! {"n": two_53}, false).unwrap();
        s.set("big", "c", doc! {"n": two_53 + 2}, false).unwrap();
        let ids = |q: Query| -> Vec<String> { s.run_query(&q).unwrap().into_iter().map(|r| r.id).collect() };

        assert_eq!(ids(Query::new("big").where_field(FieldFilter::new("n", "==", two_53))), ["b"]);
        assert_eq!(ids(Query::new("big").where_field(FieldFilter::new("n", "!=", two_53))), ["a", "c"]);
        assert_eq!(ids(Query::new("big").where_field(FieldFilter::new("n", ">", two_53 + 1))), ["c"]);
        assert_eq!(ids(Query::new("big").where_field(FieldFilter::new("n", "in", bson::bson!([two_53 + 1])))), ["a"]);
        assert_eq!(ids(Query::new("big").order_by("n", Direction::Desc)), ["c", "a", "b"]);
        assert_eq!(ids(Query::new("big").order_by("n", Direction::Asc).start_after(Bson::Int64(two_53))), ["a", "c"]);
    }

    #[test]
    fn invalid_queries_fail_at_execution() {
        let s = MemoryStore::new();
        assert!(s.run_query(&Query::new("x").limit(-1)).is_err());
        assert!(s.run_query(&Query::new("x").offset(-5)).is_err());
        assert!(s.run_query(&Query::new("x").where_field(FieldFilter::new("a", "like", 1))).is_err());
        assert!(s.run_query(&Query::new("x").limit(0)).unwrap().is_empty());
    }

    #[test]
    fn merge_set_and_get() {
        let s = seeded();
        s.set("users", "a", doc! {"age": 31}, true).unwrap();
        let r = s.get("users", "a").unwrap();
        assert_eq!(r.data.get_str("name").unwrap(), "alice");
        assert_eq!(r.path, "users/a");
        s.set("users", "a", doc! {"age": 32}, false).unwrap();
        assert!(s.get("users", "a").unwrap().data.get("name").is_none());
        assert!(matches!(s.get("users", "zz"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn bulk_writer_per_job_results() {
        let s = seeded();
        let mut w = s.bulk_writer();
        w.update("users", "a", vec![FieldUpdate::new("info.visits", 2)]).unwrap();
        w.update("users", "missing", vec![FieldUpdate::new("x", 1)]).unwrap();
        assert!(w.update("users", "b", Vec::new()).is_err());
        let twice = vec![FieldUpdate::new("x", 1), FieldUpdate::new("x", 2)];
        assert!(matches!(w.update("users", "b", twice), Err(DbError::WriteError(_))));
        w.delete("users", "b").unwrap();
        let results = w.flush().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DbError::NotFound(_))));
        assert!(results[2].is_ok());
        let a = s.get("users", "a").unwrap();
        assert_eq!(a.data.get_document("info").unwrap().get("visits"), Some(&Bson::Int32(2)));
        assert_eq!(s.len("users"), 3);
    }
}
