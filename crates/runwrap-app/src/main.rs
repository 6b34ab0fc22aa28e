#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint that loads the service configuration and hosts the
//! command wrapper.

use clap::Parser;
use runwrap_app::{AppResult, Cli, run_app};

/// Boots the service and blocks until the listener stops.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app(Cli::parse()).await
}
