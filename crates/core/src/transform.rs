//! Identifier wrapping applied to every document before it is persisted.

use serde_json::{Map, Value};

use crate::model::Document;

/// Key `mongoimport` expects around an identifier value.
pub const OID_KEY: &str = "$oid";

/// Wraps every top-level field whose name contains `id` (any case) as `{"$oid": v}`.
///
/// Nested documents and arrays are left alone. Applying this twice wraps twice;
/// callers must only run it once per fetched document.
pub fn wrap_identifiers(mut doc: Document) -> Document {
    for (key, value) in doc.iter_mut() {
        if !is_identifier_field(key) {
            continue;
        }
        let inner = value.take();
        let mut wrapped = Map::with_capacity(1);
        wrapped.insert(OID_KEY.to_string(), inner);
        *value = Value::Object(wrapped);
    }
    doc
}

/// Applies [`wrap_identifiers`] to each document of a snapshot.
pub fn wrap_snapshot(docs: Vec<Document>) -> Vec<Document> {
    docs.into_iter().map(wrap_identifiers).collect()
}

fn is_identifier_field(name: &str) -> bool {
    name.to_lowercase().contains("id")
}
