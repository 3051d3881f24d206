//! File key generation.
//!
//! Key format: `{unix_timestamp}_{token}_{filename}` where `token` is a
//! simple-form UUID v4. The timestamp keeps keys roughly time ordered and the
//! token makes collisions impractical without a uniqueness check.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

const FALLBACK_FILENAME: &str = "file";

/// Generate a new blob/record key for an uploaded file.
pub fn generate_file_key(filename: &str) -> String {
    format!(
        "{}_{}_{}",
        chrono::Utc::now().timestamp(),
        Uuid::new_v4().simple(),
        sanitize_filename(filename)
    )
}

/// Strip directory components and control characters from a client filename.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// Display name embedded in a key (everything after the second `_`).
///
/// Keys that do not follow the generated format are returned unchanged.
pub fn display_name_from_key(key: &str) -> &str {
    key.splitn(3, '_').nth(2).unwrap_or(key)
}

/// Reject keys that could escape the storage root.
///
/// `..` is only refused as a whole path segment; dots inside a filename
/// such as `draft..final.txt` are fine.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment == "..")
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
