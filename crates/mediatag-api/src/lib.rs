//! Mediatag API Library
//!
//! HTTP handlers, application state and startup wiring for the `mediatag-api`
//! binary. Handlers stay thin: every operation is delegated to
//! `mediatag_services`.

mod api_doc;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;

/// Prefix of every versioned route.
pub const API_PREFIX: &str = "/api/v1";
