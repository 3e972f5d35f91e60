use serde_json::json;

use super::{collections, decode_all, decode_doc};
use crate::db::{to_fields, DataStore, DatabaseError};
use crate::models::*;

pub fn list_midwives(store: &dyn DataStore) -> Result<Vec<Midwife>, DatabaseError> {
    let docs = store.list_documents(collections::MIDWIVES, &[])?;
    Ok(decode_all(&docs))
}

pub fn get_midwife(store: &dyn DataStore, id: &str) -> Result<Option<Midwife>, DatabaseError> {
    store
        .get_document(collections::MIDWIVES, id)?
        .map(|doc| decode_doc(&doc))
        .transpose()
}

pub fn insert_midwife(store: &dyn DataStore, midwife: &Midwife) -> Result<String, DatabaseError> {
    store.add_document(collections::MIDWIVES, to_fields(midwife)?)
}

/// Overwrite the embedded session list (booking state lives there).
pub fn update_midwife_sessions(
    store: &dyn DataStore,
    id: &str,
    sessions: &[Session],
) -> Result<(), DatabaseError> {
    store.update_document(collections::MIDWIVES, id, json!({ "sessions": to_fields(&sessions)? }))
}
