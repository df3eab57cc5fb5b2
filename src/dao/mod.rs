/// Database model definitions.
pub mod models;
/// Pet persistence operations and their backends.
pub mod pet_store;
/// Storage abstraction layer for database operations.
pub mod storage;
