use serde_json::json;

use super::{collections, decode_all, decode_doc};
use crate::db::{to_fields, DataStore, DatabaseError, Filter};
use crate::models::enums::AppointmentStatus;
use crate::models::*;

pub fn insert_appointment(
    store: &dyn DataStore,
    appointment: &Appointment,
) -> Result<String, DatabaseError> {
    store.add_document(collections::APPOINTMENTS, to_fields(appointment)?)
}

pub fn get_appointment(
    store: &dyn DataStore,
    id: &str,
) -> Result<Option<Appointment>, DatabaseError> {
    store
        .get_document(collections::APPOINTMENTS, id)?
        .map(|doc| decode_doc(&doc))
        .transpose()
}

pub fn list_user_appointments(
    store: &dyn DataStore,
    user_id: &str,
) -> Result<Vec<Appointment>, DatabaseError> {
    let docs = store.list_documents(collections::APPOINTMENTS, &[Filter::eq("user", user_id)])?;
    Ok(decode_all(&docs))
}

pub fn update_appointment_status(
    store: &dyn DataStore,
    id: &str,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    store.update_document(collections::APPOINTMENTS, id, json!({ "status": status.as_str() }))
}
