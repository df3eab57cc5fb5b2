//! Error types of the MongoDB pet store.

use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB pet store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required environment variable is unset.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered during startup.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried before giving up.
        attempts: u32,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A periodic health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Creating a collection or its indexes failed.
    #[error("failed to prepare collection `{collection}`")]
    PrepareCollection {
        /// Collection name.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Upserting a pet failed.
    #[error("failed to save pet of `{user_id}`")]
    SavePet {
        /// Owner of the pet.
        user_id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading a pet failed.
    #[error("failed to load pet of `{user_id}`")]
    LoadPet {
        /// Owner of the pet.
        user_id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Listing registered users failed.
    #[error("failed to list users")]
    ListUsers {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Appending to the activity log failed.
    #[error("failed to append activity")]
    PushActivity {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading the activity log failed.
    #[error("failed to read activity log")]
    ReadActivity {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The leaderboard query failed.
    #[error("failed to compute leaderboard")]
    Leaderboard {
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
