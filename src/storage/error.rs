//! Storage-specific error types.

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing a key failed
    #[error("Storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    /// State could not be serialized
    #[error("Failed to serialize state: {0}")]
    Serialization(String),

    /// Stored blob could not be deserialized
    #[error("Failed to deserialize state for key '{key}': {message}")]
    Deserialization { key: String, message: String },

    /// Backend refused the write
    #[error("Storage rejected write for key '{key}'")]
    WriteRejected { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let error = StorageError::WriteRejected {
            key: "counter-storage".to_string(),
        };
        assert!(error.to_string().contains("counter-storage"));

        let error = StorageError::Deserialization {
            key: "todo-storage".to_string(),
            message: "expected value".to_string(),
        };
        assert!(error.to_string().contains("todo-storage"));
        assert!(error.to_string().contains("expected value"));

        let error = StorageError::Io {
            key: "k".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(error.to_string().contains("gone"));
    }
}
