//! HTTP routers, handlers, and middleware.

/// Header names shared by the middleware stack.
pub mod constants;
/// Execution and informational handlers.
pub mod handlers;
/// Health and metrics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
