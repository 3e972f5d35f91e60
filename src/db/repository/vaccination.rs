use super::{collections, decode_all, decode_doc};
use crate::db::{to_fields, DataStore, DatabaseError, Filter};
use crate::models::*;

/// The master schedule, in stored order.
pub fn list_schedule(store: &dyn DataStore) -> Result<Vec<VaccineSchedule>, DatabaseError> {
    let docs = store.list_documents(collections::SCHEDULES, &[])?;
    Ok(decode_all(&docs))
}

pub fn get_schedule_entry(
    store: &dyn DataStore,
    vaccine_id: &str,
) -> Result<Option<VaccineSchedule>, DatabaseError> {
    store
        .get_document(collections::SCHEDULES, vaccine_id)?
        .map(|doc| decode_doc(&doc))
        .transpose()
}

pub fn insert_schedule_entry(
    store: &dyn DataStore,
    vaccine_id: &str,
    entry: &VaccineSchedule,
) -> Result<(), DatabaseError> {
    store.set_document(collections::SCHEDULES, vaccine_id, to_fields(entry)?)
}

pub fn list_child_records(
    store: &dyn DataStore,
    child_id: &str,
) -> Result<Vec<VaccinationRecord>, DatabaseError> {
    let docs = store.list_documents(collections::RECORDS, &[Filter::eq("childId", child_id)])?;
    Ok(decode_all(&docs))
}

pub fn list_child_records_by_status(
    store: &dyn DataStore,
    child_id: &str,
    status: &str,
) -> Result<Vec<VaccinationRecord>, DatabaseError> {
    let docs = store.list_documents(
        collections::RECORDS,
        &[Filter::eq("childId", child_id), Filter::eq("status", status)],
    )?;
    Ok(decode_all(&docs))
}

pub fn get_record(
    store: &dyn DataStore,
    record_id: &str,
) -> Result<Option<VaccinationRecord>, DatabaseError> {
    store
        .get_document(collections::RECORDS, record_id)?
        .map(|doc| decode_doc(&doc))
        .transpose()
}

/// Append a record. Records are never updated or removed.
pub fn insert_record(
    store: &dyn DataStore,
    record: &VaccinationRecord,
) -> Result<String, DatabaseError> {
    store.add_document(collections::RECORDS, to_fields(record)?)
}

/// Every vaccination session, under any parent, that invites the child.
pub fn list_sessions_for_child(
    store: &dyn DataStore,
    child_id: &str,
) -> Result<Vec<VaccinationSession>, DatabaseError> {
    let docs = store.collection_group(
        collections::SESSIONS,
        &[Filter::array_contains("selectedParticipants", child_id)],
    )?;
    Ok(decode_all(&docs))
}
