//! API endpoint handlers, one module per app area.

pub mod appointments;
pub mod auth;
pub mod children;
pub mod events;
pub mod health;
pub mod midwives;
pub mod reminders;
pub mod vaccines;
