//! Mediatag Storage Library
//!
//! Blob store abstraction with S3, local filesystem and in-memory backends.
//!
//! # Key format
//!
//! Every upload is stored under `{unix_timestamp}_{token}_{filename}`. The key
//! is the record's primary key in the metadata store as well, so it is never
//! rewritten. Keys must not be empty, contain `..`, or start with `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

pub use factory::create_storage;
pub use keys::{display_name_from_key, generate_file_key, sanitize_filename, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use mediatag_core::StorageBackend;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signing::UrlSigner;
pub use traits::{ObjectLocation, Storage, StorageError, StorageResult};
