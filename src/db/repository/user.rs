use serde_json::json;

use super::{collections, decode_doc};
use crate::db::{to_fields, DataStore, DatabaseError};
use crate::models::*;

pub fn get_user(store: &dyn DataStore, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
    store
        .get_document(collections::USERS, user_id)?
        .map(|doc| decode_doc(&doc))
        .transpose()
}

/// Resolve several users, silently dropping ids with no profile.
pub fn get_users(store: &dyn DataStore, ids: &[String]) -> Result<Vec<UserProfile>, DatabaseError> {
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = get_user(store, id)? {
            users.push(user);
        }
    }
    Ok(users)
}

pub fn set_user(
    store: &dyn DataStore,
    user_id: &str,
    profile: &UserProfile,
) -> Result<(), DatabaseError> {
    store.set_document(collections::USERS, user_id, to_fields(profile)?)
}

pub fn update_push_token(
    store: &dyn DataStore,
    user_id: &str,
    token: &str,
) -> Result<(), DatabaseError> {
    store.update_document(collections::USERS, user_id, json!({ "pushToken": token }))
}
