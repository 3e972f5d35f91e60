//! HTTP API.
//!
//! Exposes the booking, monitoring, vaccination and event operations as
//! JSON endpoints under `/api/`. Protected routes resolve the caller's
//! bearer session into an `AuthSession` before the handler runs.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ApiServerInfo};
pub use types::ApiContext;
