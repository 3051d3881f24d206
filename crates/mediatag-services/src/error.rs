use mediatag_core::AppError;
use mediatag_storage::StorageError;

/// Request-path mapping of blob store failures.
pub fn storage_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(key) => AppError::NotFound(format!("File {} not found", key)),
        StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
        StorageError::InvalidSignature(msg) => AppError::BadRequest(msg),
        other => AppError::Storage(other.to_string()),
    }
}

/// Request-path mapping of metadata store failures.
pub fn metadata_error(err: anyhow::Error) -> AppError {
    AppError::Metadata(format!("{:#}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_mapping() {
        assert!(matches!(
            storage_error(StorageError::NotFound("k".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            storage_error(StorageError::InvalidKey("..".into())),
            AppError::InvalidInput(_)
        ));
        assert!(matches!(
            storage_error(StorageError::UploadFailed("boom".into())),
            AppError::Storage(_)
        ));
    }

    #[test]
    fn test_metadata_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection reset").context("Failed to scan media records");
        match metadata_error(err) {
            AppError::Metadata(msg) => {
                assert_eq!(msg, "Failed to scan media records: connection reset")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
