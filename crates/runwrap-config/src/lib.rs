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

//! File-backed service configuration for the runwrap execution wrapper.
//!
//! Layout: `model.rs` (typed config document), `loader.rs` (file loading),
//! `profile.rs` (environment resolution into the immutable runtime profile).

pub mod error;
pub mod loader;
pub mod model;
pub mod profile;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, parse_config};
pub use model::ServiceConfig;
pub use profile::{ConfigReport, EnvLookup, MAX_NUM_PROCS, ServiceProfile, basic_auth_header};
