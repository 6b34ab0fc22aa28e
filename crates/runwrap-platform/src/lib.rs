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

//! Client for the remote storage, ingest, and service catalog platform.
//!
//! Layout: `model.rs` (wire and domain types), `client.rs` (the
//! [`PlatformClient`] seam), `http.rs` (reqwest implementation),
//! `disposition.rs` (download filename resolution), `registration.rs`
//! (service upsert).

pub mod client;
pub mod disposition;
pub mod error;
pub mod http;
pub mod model;
pub mod registration;

pub use client::PlatformClient;
pub use disposition::{
    DEFAULT_FILE_NAME, filename_from_disposition, filename_from_url, sanitize_file_name,
};
pub use error::{PlatformError, PlatformResult};
pub use http::HttpPlatform;
pub use model::{
    ClassType, IngestKind, IngestMetadata, IngestSubmission, JobState, JobStatusReport,
    PlatformTarget, ResourceMetadata, ServiceDescriptor, TaskAssignment, TaskOutcome,
};
pub use registration::{RegistrationOutcome, manage_registration};
