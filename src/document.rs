use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub type DocumentId = String;

/// Metadata keys added when a record is flattened for output.
pub const ID_KEY: &str = "_id";
pub const REF_KEY: &str = "_ref";

/// A document as returned by the store: its fields plus identity metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: DocumentId,
    /// Full path of the document, `collection/id`.
    pub path: String,
    pub data: BsonDocument,
}

impl Record {
    #[must_use]
    pub fn new(collection: &str, id: impl Into<DocumentId>, data: BsonDocument) -> Self {
        let id = id.into();
        Self { path: doc_path(collection, &id), id, data }
    }

    /// Fields plus `_id` and `_ref`.
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        let mut out = self.data.clone();
        out.insert(ID_KEY, self.id.clone());
        out.insert(REF_KEY, self.path.clone());
        out
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        bson_to_json(&Bson::Document(self.to_document()))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[must_use]
pub fn doc_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

/// Handle to a single document location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub path: String,
}

/// One field-level change submitted through an update.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: String,
    pub value: Bson,
}

impl FieldUpdate {
    pub fn new(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self { path: path.into(), value: value.into() }
    }
}

/// Result of one successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: String,
    pub update_time: DateTime<Utc>,
}

impl WriteOutcome {
    #[must_use]
    pub fn now(path: String) -> Self {
        Self { path, update_time: Utc::now() }
    }
}

/// Converts a JSON value into BSON. Integers that fit in `i64` become `Int64`.
#[must_use]
pub fn json_to_bson(v: Value) -> Bson {
    match v {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Bson::Int64(i)
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s),
        Value::Array(a) => Bson::Array(a.into_iter().map(json_to_bson).collect()),
        Value::Object(m) => Bson::Document(json_object_to_document(m)),
    }
}

#[must_use]
pub fn json_object_to_document(m: Map<String, Value>) -> BsonDocument {
    let mut d = BsonDocument::new();
    for (k, v) in m {
        d.insert(k, json_to_bson(v));
    }
    d
}

/// Relaxed JSON rendering; datetimes become RFC 3339 strings.
#[must_use]
pub fn bson_to_json(v: &Bson) -> Value {
    match v {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Array(a) => Value::Array(a.iter().map(bson_to_json).collect()),
        Bson::Document(d) => {
            Value::Object(d.iter().map(|(k, v)| (k.clone(), bson_to_json(v))).collect())
        }
        Bson::DateTime(dt) => DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
            .map_or(Value::Null, |t| Value::String(t.to_rfc3339())),
        other => Value::String(other.to_string()),
    }
}

/// Turns any serializable struct into a field mapping.
///
/// # Errors
/// Returns an error if `value` does not serialize to a JSON object.
pub fn to_fields<T: Serialize>(value: &T) -> Result<BsonDocument, DbError> {
    match serde_json::to_value(value)? {
        Value::Object(m) => Ok(json_object_to_document(m)),
        other => Err(DbError::InvalidClause(format!("expected an object, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn flattened_record_carries_id_and_ref() {
        let r = Record::new("users", "u1", doc! {"name": "alice"});
        let d = r.to_document();
        assert_eq!(d.get("_id"), Some(&Bson::String("u1".into())));
        assert_eq!(d.get("_ref"), Some(&Bson::String("users/u1".into())));
        assert_eq!(r.to_json()["name"], "alice");
    }

    #[test]
    fn json_numbers_and_nesting() {
        let b = json_to_bson(serde_json::json!({"a": 1, "b": 1.5, "c": [true, null], "d": {"e": "x"}}));
        let Bson::Document(d) = b else { panic!("not a document") };
        assert_eq!(d.get("a"), Some(&Bson::Int64(1)));
        assert_eq!(d.get("b"), Some(&Bson::Double(1.5)));
        assert_eq!(d.get("c"), Some(&Bson::Array(vec![Bson::Boolean(true), Bson::Null])));
        assert_eq!(bson_to_json(&Bson::Document(d))["d"]["e"], "x");
    }

    #[test]
    fn struct_to_fields() {
        #[derive(Serialize)]
        struct User {
            name: String,
            age: u8,
        }
        let d = to_fields(&User { name: "bob".into(), age: 7 }).unwrap();
        assert_eq!(d.get("age"), Some(&Bson::Int64(7)));
        assert!(to_fields(&5).is_err());
    }
}
