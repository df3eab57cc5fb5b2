use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

type BoxedSource = Box<dyn Error + Send + Sync>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Backend-specific description.
        message: String,
        /// Underlying backend error.
        #[source]
        source: BoxedSource,
    },
    /// A stored record exists but cannot be decoded.
    #[error("corrupted record `{key}`")]
    Corrupted {
        /// Key of the unreadable record.
        key: String,
        /// Underlying backend error.
        #[source]
        source: BoxedSource,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a corruption error for the record stored under `key`.
    pub fn corrupted(key: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Corrupted {
            key: key.into(),
            source: Box::new(source),
        }
    }
}
