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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (install dirs, scripts, profiles), mocks.rs (scripted platform double).

pub mod fixtures;
pub mod mocks;

pub use fixtures::{install_dir, profile_in, write_script};
pub use mocks::{PlatformCall, ScriptedPlatform};
