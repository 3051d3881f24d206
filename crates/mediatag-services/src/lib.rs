//! Mediatag service layer.
//!
//! Orchestration lives here: the upload pipeline (store → classify → extract
//! → persist → register jobs), keyword and natural-language search, and the
//! media lifecycle (list, get, transcript, delete). Every entry point takes a
//! [`ServiceContext`] built once at startup; the API crate stays a thin HTTP
//! layer on top.

pub mod context;
pub mod error;
pub mod lifecycle;
pub mod providers;
pub mod search;
pub mod upload;

pub use context::ServiceContext;
pub use error::{metadata_error, storage_error};
pub use lifecycle::{delete_media, fetch_blob, get_media, get_transcript, list_media};
pub use providers::{build_capabilities, build_completer};
pub use search::{build_prompt, keyword_search, natural_language_search, parse_indices, NO_MATCHES};
pub use upload::upload_media;
