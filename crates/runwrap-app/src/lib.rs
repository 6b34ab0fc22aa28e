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
#![allow(clippy::module_name_repetitions)]

//! runwrap application bootstrap wiring.
//!
//! Layout: `cli.rs` (arguments), `bootstrap.rs` (startup sequence),
//! `dispatcher.rs` (task-queue worker), `error.rs` (application errors).

/// Application bootstrap.
pub mod bootstrap;
/// Command line arguments.
pub mod cli;
/// Task-queue worker.
pub mod dispatcher;
/// Application-level errors.
pub mod error;

pub use bootstrap::{resolve_version, run_app, service_descriptor};
pub use cli::Cli;
pub use dispatcher::{DispatchIntervals, Dispatcher, Step};
pub use error::{AppError, AppResult};
