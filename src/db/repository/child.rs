use serde_json::json;

use super::{collections, decode_all, decode_doc};
use crate::db::{to_fields, DataStore, DatabaseError};
use crate::models::*;

pub fn insert_child(
    store: &dyn DataStore,
    user_id: &str,
    child: &Child,
) -> Result<String, DatabaseError> {
    store.add_document(&collections::children_of(user_id), to_fields(child)?)
}

pub fn get_child(
    store: &dyn DataStore,
    user_id: &str,
    child_id: &str,
) -> Result<Option<Child>, DatabaseError> {
    store
        .get_document(&collections::children_of(user_id), child_id)?
        .map(|doc| decode_doc(&doc))
        .transpose()
}

pub fn list_children(store: &dyn DataStore, user_id: &str) -> Result<Vec<Child>, DatabaseError> {
    let docs = store.list_documents(&collections::children_of(user_id), &[])?;
    Ok(decode_all(&docs))
}

pub fn update_measurements(
    store: &dyn DataStore,
    user_id: &str,
    child_id: &str,
    measurements: &Measurements,
) -> Result<(), DatabaseError> {
    store.update_document(
        &collections::children_of(user_id),
        child_id,
        json!({ "measurements": to_fields(measurements)? }),
    )
}

/// Remove the child and everything stored beneath it.
pub fn delete_child(
    store: &dyn DataStore,
    user_id: &str,
    child_id: &str,
) -> Result<(), DatabaseError> {
    store.delete_document(&collections::children_of(user_id), child_id)
}
