//! Errors raised while hosting the API.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result alias for server lifecycle operations.
pub type ApiServerResult<T> = Result<T, ApiServerError>;

/// Failures binding or running the listener.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// The listener could not bind its address.
    #[error("failed to bind {addr}")]
    Bind {
        /// Address requested.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server loop terminated with an error.
    #[error("API server terminated")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
