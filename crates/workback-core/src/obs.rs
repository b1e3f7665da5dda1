//! Structured lifecycle events for synchronization runs.
//!
//! - Run-scoped spans via [`run_span`] and the [`RunSpan`] guard
//! - `emit_*` functions for run start, per-deliverable outcomes, stage
//!   failures, project degradation and run finish
//!
//! Events carry an `event` field so JSON log consumers can filter on it.

use tracing::{info, warn};

use crate::error::StageError;
use crate::orchestrator::SyncStatus;

/// Span tagged with the run id and release name.
///
/// Use with `tracing::Instrument` around async work.
pub fn run_span(run_id: &str, release: &str) -> tracing::Span {
    tracing::info_span!("workback.run", run_id = %run_id, release = %release)
}

/// RAII guard that enters a run span for synchronous work.
///
/// ```ignore
/// let _span = RunSpan::enter("run-123", "v2.0");
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str, release: &str) -> Self {
        Self {
            _span: run_span(run_id, release).entered(),
        }
    }
}

pub fn emit_run_started(run_id: &str, release: &str, deliverables: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        release = %release,
        deliverables = deliverables,
    );
}

/// Emit event: one deliverable finished synchronizing.
pub fn emit_deliverable_synced(title: &str, status: SyncStatus, issue_number: Option<u64>) {
    info!(
        event = "deliverable.synced",
        title = %title,
        status = ?status,
        issue = issue_number,
    );
}

/// Emit event: a synchronization stage failed (warning level).
pub fn emit_stage_failed(title: &str, err: &StageError) {
    warn!(
        event = "stage.failed",
        title = %title,
        stage = %err.stage(),
        fatal = err.is_fatal(),
        error = %err,
    );
}

/// Emit event: the project board is unavailable and the run continues without it.
pub fn emit_project_unavailable(owner: &str, number: u64, reason: &str) {
    warn!(
        event = "project.unavailable",
        owner = %owner,
        number = number,
        reason = %reason,
    );
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, created: usize, failed: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        created = created,
        failed = failed,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;

    #[test]
    fn test_run_span_create() {
        let _span = RunSpan::enter("test-run-id", "v1");
    }

    #[test]
    fn test_emitters_do_not_panic_without_subscriber() {
        emit_run_started("r", "v1", 2);
        emit_deliverable_synced("Add search", SyncStatus::FullySynced, Some(1));
        emit_stage_failed(
            "Add search",
            &StageError::Creation(TrackerError::Validation("bad".to_string())),
        );
        emit_project_unavailable("acme", 3, "not found");
        emit_run_finished("r", 10, 1, 1);
    }
}
