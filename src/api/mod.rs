//! HTTP API.
//!
//! The function routes keep the request and response shapes of the
//! club's original edge functions; `/api/...` adds job and inbox
//! management. `api_router()` returns a composable `Router`.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
