//! Job execution and state tracking for scanward.
//!
//! A scan request flows through three pieces:
//!
//! - [`registry::JobRegistry`] stores job and result records and applies
//!   lifecycle transitions atomically.
//! - [`executor::ScanExecutor`] runs the external scanner and normalizes its
//!   outcome.
//! - [`orchestrator::ScanOrchestrator`] registers jobs, hands them to the
//!   [`worker::WorkerPool`] (or runs them inline for synchronous callers) and
//!   answers status/result queries.
#![allow(missing_docs)]

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod registry;
pub mod worker;

pub use error::SubmitError;
pub use executor::{NmapExecutor, ScanExecutor, ScanInvocation};
pub use orchestrator::{
    OrchestratorSettings, ResultLookup, ScanOrchestrator, SubmitMode, SubmitReceipt,
};
pub use registry::{InMemoryJobRegistry, JobRegistry, JobTransition};
pub use worker::{JobRun, PANICKED_MESSAGE, WorkerConfig, WorkerPool};
