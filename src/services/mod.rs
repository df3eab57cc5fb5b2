/// Activity feed and leaderboard queries.
pub mod activity_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
pub mod notifications;
pub mod pet_events;
pub mod pet_service;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
pub mod tick_scheduler;
/// WebSocket connection and message handling service.
pub mod websocket_service;
