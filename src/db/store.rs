//! Document store collaborator.
//!
//! The app's data lives in a hierarchical document tree addressed by
//! slash-separated paths (`Users/{uid}/Childrens/{id}`). `DataStore` is the
//! seam every screen-level operation goes through; `SqliteDocumentStore`
//! is the bundled implementation, one JSON document per row.
//!
//! Only the operations the app needs are offered: point reads, filtered
//! listing, add/set/update/delete of single documents, and a collection-group
//! scan. Filters are equality or array-contains. No transactions.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{open_database, open_memory_database, DatabaseError};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// A fetched document: its id, full path and raw field data.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub path: String,
    pub data: Value,
}

impl Document {
    /// Decode the document fields into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DatabaseError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Path of the collection holding this document.
    pub fn collection_path(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .unwrap_or("")
    }
}

/// Query predicate applied to a document's fields.
///
/// Field names may be dotted (`measurements.heightHistory`) to reach
/// into nested maps.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    ArrayContains(String, Value),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Filter::ArrayContains(field.to_string(), value.into())
    }

    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => lookup(data, field) == Some(expected),
            Filter::ArrayContains(field, expected) => match lookup(data, field) {
                Some(Value::Array(items)) => items.contains(expected),
                _ => false,
            },
        }
    }
}

fn lookup<'a>(data: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(data, |current, key| current.as_object()?.get(key))
}

/// Serialize a typed record into document fields.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Value, DatabaseError> {
    Ok(serde_json::to_value(value)?)
}

// ═══════════════════════════════════════════════════════════
// Collaborator interface
// ═══════════════════════════════════════════════════════════

/// Operations the app performs against its document store.
///
/// `collection` is always a collection path (odd number of segments,
/// e.g. `Midwives` or `Users/u1/Childrens`). Listings return documents
/// in insertion order.
pub trait DataStore: Send + Sync {
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError>;

    fn list_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, DatabaseError>;

    /// Insert a document under a generated id and return the id.
    fn add_document(&self, collection: &str, fields: Value) -> Result<String, DatabaseError>;

    /// Create or replace a document under a caller-chosen id.
    fn set_document(&self, collection: &str, id: &str, fields: Value) -> Result<(), DatabaseError>;

    /// Merge top-level fields into an existing document.
    fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a document together with everything stored beneath it.
    fn delete_document(&self, collection: &str, id: &str) -> Result<(), DatabaseError>;

    /// Scan every collection named `name`, whatever its parent document.
    fn collection_group(&self, name: &str, filters: &[Filter])
        -> Result<Vec<Document>, DatabaseError>;
}

// ═══════════════════════════════════════════════════════════
// Path helpers
// ═══════════════════════════════════════════════════════════

/// Validate a collection path and return its last segment.
fn collection_name(collection: &str) -> Result<&str, DatabaseError> {
    let segments: Vec<&str> = collection.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) || segments.len() % 2 == 0 {
        return Err(DatabaseError::InvalidPath(collection.to_string()));
    }
    Ok(segments[segments.len() - 1])
}

fn document_path(collection: &str, id: &str) -> Result<String, DatabaseError> {
    collection_name(collection)?;
    if id.is_empty() || id.contains('/') {
        return Err(DatabaseError::InvalidPath(format!("{collection}/{id}")));
    }
    Ok(format!("{collection}/{id}"))
}

fn require_object(fields: Value) -> Result<Map<String, Value>, DatabaseError> {
    match fields {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::ConstraintViolation(format!(
            "document fields must be an object, got {other}"
        ))),
    }
}

// ═══════════════════════════════════════════════════════════
// SQLite implementation
// ═══════════════════════════════════════════════════════════

/// Document store backed by a single SQLite table.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run a closure with exclusive access to the underlying connection.
    pub fn with_conn<R>(
        &self,
        f: impl FnOnce(&Connection) -> Result<R, DatabaseError>,
    ) -> Result<R, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    fn query(
        &self,
        sql: &str,
        key: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, DatabaseError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params![key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut docs = Vec::new();
            for row in rows {
                let (id, path, raw) = row?;
                let data: Value = serde_json::from_str(&raw)?;
                if filters.iter().all(|f| f.matches(&data)) {
                    docs.push(Document { id, path, data });
                }
            }
            Ok(docs)
        })
    }
}

impl DataStore for SqliteDocumentStore {
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        let path = document_path(collection, id)?;
        self.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT data FROM documents WHERE path = ?1",
                    params![path],
                    |row| row.get(0),
                )
                .optional()?;
            match raw {
                Some(raw) => Ok(Some(Document {
                    id: id.to_string(),
                    path,
                    data: serde_json::from_str(&raw)?,
                })),
                None => Ok(None),
            }
        })
    }

    fn list_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, DatabaseError> {
        collection_name(collection)?;
        let docs = self.query(
            "SELECT doc_id, path, data FROM documents WHERE collection_path = ?1 ORDER BY seq",
            collection,
            filters,
        )?;
        tracing::debug!(collection, count = docs.len(), "Listed documents");
        Ok(docs)
    }

    fn add_document(&self, collection: &str, fields: Value) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().simple().to_string();
        self.set_document(collection, &id, fields)?;
        Ok(id)
    }

    fn set_document(&self, collection: &str, id: &str, fields: Value) -> Result<(), DatabaseError> {
        let name = collection_name(collection)?.to_string();
        let path = document_path(collection, id)?;
        let data = Value::Object(require_object(fields)?);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (path, collection_path, collection_name, doc_id, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(path) DO UPDATE SET data = excluded.data, updated_at = datetime('now')",
                params![path, collection, name, id, data.to_string()],
            )?;
            Ok(())
        })
    }

    fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), DatabaseError> {
        let path = document_path(collection, id)?;
        let changes = require_object(fields)?;
        self.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT data FROM documents WHERE path = ?1",
                    params![path],
                    |row| row.get(0),
                )
                .optional()?;
            let raw = raw.ok_or_else(|| DatabaseError::NotFound {
                entity_type: collection.to_string(),
                id: id.to_string(),
            })?;

            let mut data: Map<String, Value> = serde_json::from_str(&raw)?;
            data.extend(changes);

            conn.execute(
                "UPDATE documents SET data = ?1, updated_at = datetime('now') WHERE path = ?2",
                params![Value::Object(data).to_string(), path],
            )?;
            Ok(())
        })
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<(), DatabaseError> {
        let path = document_path(collection, id)?;
        let prefix = format!("{path}/");
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM documents
                 WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2",
                params![path, prefix],
            )?;
            tracing::debug!(path, removed, "Deleted document tree");
            Ok(())
        })
    }

    fn collection_group(
        &self,
        name: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, DatabaseError> {
        if name.is_empty() || name.contains('/') {
            return Err(DatabaseError::InvalidPath(name.to_string()));
        }
        self.query(
            "SELECT doc_id, path, data FROM documents WHERE collection_name = ?1 ORDER BY seq",
            name,
            filters,
        )
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
