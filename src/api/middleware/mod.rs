//! API middleware.
//!
//! Protected routes run behind `auth::require_auth`; the router adds CORS
//! and `Cache-Control: no-store` around them.

pub mod auth;
