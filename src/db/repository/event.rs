use serde_json::json;

use super::{collections, decode_all, decode_doc};
use crate::db::{to_fields, DataStore, DatabaseError};
use crate::models::*;

pub fn list_events(store: &dyn DataStore) -> Result<Vec<Event>, DatabaseError> {
    let docs = store.list_documents(collections::EVENTS, &[])?;
    Ok(decode_all(&docs))
}

pub fn get_event(store: &dyn DataStore, id: &str) -> Result<Option<Event>, DatabaseError> {
    store
        .get_document(collections::EVENTS, id)?
        .map(|doc| decode_doc(&doc))
        .transpose()
}

pub fn insert_event(store: &dyn DataStore, event: &Event) -> Result<String, DatabaseError> {
    store.add_document(collections::EVENTS, to_fields(event)?)
}

pub fn update_joined_people(
    store: &dyn DataStore,
    id: &str,
    people: &[String],
) -> Result<(), DatabaseError> {
    store.update_document(collections::EVENTS, id, json!({ "EventJoinedPeople": people }))
}
