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

//! Bounded-concurrency execution pipeline.
//!
//! A request flows through [`Executor::execute`]: it takes a slot from the
//! [`ConcurrencyGate`], opens a private [`Workspace`], stages inputs from the
//! platform and from external URLs, runs the configured command, publishes the
//! declared outputs through the asynchronous ingest protocol, and folds every
//! per-item failure into one [`ExecutionResult`].

pub mod error;
pub mod gate;
pub mod ids;
pub mod ingest;
pub mod inputs;
pub mod pipeline;
pub mod request;
pub mod result;
pub mod runner;
pub mod session;
pub mod workspace;

pub use error::{PipelineError, PipelineResult};
pub use gate::{ConcurrencyGate, GatePermit};
pub use ids::pseudo_uuid;
pub use ingest::{PollPolicy, await_data_id, proc_time};
pub use pipeline::Executor;
pub use request::ExecutionRequest;
pub use result::ExecutionResult;
pub use runner::{RunOutcome, build_argv, disambiguate, run_command};
pub use session::{ANONYMOUS_USER, Session};
pub use workspace::Workspace;
