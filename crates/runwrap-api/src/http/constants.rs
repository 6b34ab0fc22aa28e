//! Shared constants for the HTTP surface.

/// Header carrying the per-request identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";
