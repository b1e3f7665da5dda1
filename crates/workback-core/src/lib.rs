//! Workback Core: deliverable triage and tracker synchronization
//!
//! Turns a dated release workback schedule into tracked items on an issue
//! tracker, optionally attached to a project board.
//!
//! ## Pipeline
//!
//! 1. [`classifier`]: Feature vs Task by keyword scoring
//! 2. [`analyzer`]: automatable / human-required / needs-clarification against
//!    a [`RepositoryContext`]
//! 3. [`render`]: title, body, labels and assignees
//! 4. [`orchestrator`]: best-effort create, attach and field update per item
//! 5. [`driver`]: sequential run over the plan, producing a [`RunSummary`]
//!
//! The tracker is reached only through the [`TrackerGateway`] trait.

pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod context;
pub mod driver;
mod error;
pub mod fakes;
pub mod obs;
pub mod orchestrator;
pub mod plan;
pub mod probe;
pub mod render;
pub mod retry;
pub mod summary;
pub mod telemetry;
pub mod tracker;

pub use analyzer::{analyze, AssignabilityResult, AssignmentDecision};
pub use classifier::{classify, Classification, WorkType};
pub use config::{ProjectLookup, RepositoryRef, SyncConfig, ValidatedConfig};
pub use context::RepositoryContext;
pub use driver::{PreparedDeliverable, RunDriver, RunOptions};
pub use error::{
    Result, RetryPolicy, StageError, TrackerError, TrackerResult, WorkbackError,
};
pub use orchestrator::{SyncOrchestrator, SyncOutcome, SyncStage, SyncStatus};
pub use plan::{ReleasePlan, ScheduleWindow};
pub use probe::probe_repository;
pub use retry::{RetryConfig, RetryingGateway};
pub use summary::{DeliverableReport, ProjectStatus, RunCounts, RunSummary};
pub use telemetry::init_tracing;
pub use tracker::{CreatedItem, TrackerGateway, TrackerItem, TrackerProject};

/// Workback version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
