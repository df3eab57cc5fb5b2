//! Error types of the CouchDB pet store.

use reqwest::StatusCode;
use thiserror::Error;

pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// A required environment variable is unset.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The database could not be queried or created.
    #[error("failed to reach CouchDB database `{database}`")]
    Database {
        /// Database name.
        database: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The database endpoint answered with an unexpected status.
    #[error("unexpected CouchDB database response status {status} for `{database}`")]
    DatabaseStatus {
        /// Database name.
        database: String,
        /// Status returned by CouchDB.
        status: StatusCode,
    },
    /// A request never reached CouchDB.
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        /// Request path relative to the server.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// A request was answered with an unexpected status.
    #[error("unexpected CouchDB response status {status} for `{path}`")]
    RequestStatus {
        /// Request path relative to the server.
        path: String,
        /// Status returned by CouchDB.
        status: StatusCode,
    },
    /// A response body could not be read.
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        /// Request path relative to the server.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// A stored document does not match the expected shape.
    #[error("failed to deserialize CouchDB value for `{path}`")]
    DeserializeValue {
        /// Request path relative to the server.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Concurrent writers kept updating the same document.
    #[error("gave up writing `{path}` after {attempts} revision conflicts")]
    Contended {
        /// Request path relative to the server.
        path: String,
        /// Writes tried before giving up.
        attempts: u32,
    },
}

impl CouchDaoError {
    /// Whether CouchDB refused a write because of a stale revision.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CouchDaoError::RequestStatus {
                status: StatusCode::CONFLICT,
                ..
            }
        )
    }
}
