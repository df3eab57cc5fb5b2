//! Library crate for kodomochi-back, exposing modules for binaries and integration tests.

pub mod config;
/// Persistence layer and storage backends.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Error types shared by services and handlers.
pub mod error;
/// HTTP routers.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state and the pet engine.
pub mod state;
