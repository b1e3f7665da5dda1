//! Run results: per-deliverable reports, aggregate counts and the text and
//! JSON renderings printed by the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analyzer::AssignmentDecision;
use crate::classifier::{WorkType, KEYWORD_TABLE_VERSION};
use crate::orchestrator::{SyncOutcome, SyncStatus};

/// Whether the run had a project board to enrich items with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProjectStatus {
    NotRequested,
    Attached { project_id: String },
    /// Requested but unresolvable; the run continued without project integration.
    Unavailable { reason: String },
}

/// One deliverable's triage and synchronization result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverableReport {
    pub date_label: String,
    pub deliverable: String,
    pub work_type: WorkType,
    pub decision: AssignmentDecision,
    pub confidence: u8,
    pub outcome: SyncOutcome,
}

/// Aggregate counters over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub total: usize,
    pub created: usize,
    pub added_to_project: usize,
    pub field_updated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub fully_synced: usize,
    pub created_not_enriched: usize,
}

/// Result of a synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub release: String,
    pub started_at: DateTime<Utc>,
    /// Classifier keyword table the run was triaged with.
    pub keyword_table_version: u32,
    pub project: ProjectStatus,
    pub deliverables: Vec<DeliverableReport>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn new(release: &str, project: ProjectStatus) -> Self {
        RunSummary {
            run_id: Uuid::new_v4(),
            release: release.to_string(),
            started_at: Utc::now(),
            keyword_table_version: KEYWORD_TABLE_VERSION,
            project,
            deliverables: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts {
            total: self.deliverables.len(),
            ..Default::default()
        };
        for report in &self.deliverables {
            let outcome = &report.outcome;
            counts.created += usize::from(outcome.created);
            counts.added_to_project += usize::from(outcome.added_to_project);
            counts.field_updated += usize::from(outcome.field_updated);
            match outcome.status() {
                SyncStatus::FullySynced => counts.fully_synced += 1,
                SyncStatus::CreatedNotEnriched => counts.created_not_enriched += 1,
                SyncStatus::NotCreated => counts.failed += 1,
                SyncStatus::SkippedExisting => counts.skipped += 1,
            }
        }
        counts
    }

    /// True when the project was requested and could not be resolved.
    pub fn project_unavailable(&self) -> bool {
        matches!(self.project, ProjectStatus::Unavailable { .. })
    }

    /// Human-readable run report.
    pub fn render_text(&self) -> String {
        let counts = self.counts();
        let mut out = String::new();
        out.push_str(&format!("Release: {}\n", self.release));
        out.push_str(&format!("Run: {}\n", self.run_id));
        out.push_str(&format!("Keyword table: v{}\n", self.keyword_table_version));
        match &self.project {
            ProjectStatus::NotRequested => out.push_str("Project: not requested\n"),
            ProjectStatus::Attached { project_id } => {
                out.push_str(&format!("Project: {}\n", project_id))
            }
            ProjectStatus::Unavailable { reason } => {
                out.push_str(&format!("Project: unavailable ({})\n", reason))
            }
        }
        out.push('\n');

        for report in &self.deliverables {
            let outcome = &report.outcome;
            let marker = match outcome.status() {
                SyncStatus::FullySynced => "ok",
                SyncStatus::CreatedNotEnriched => "partial",
                SyncStatus::NotCreated => "FAILED",
                SyncStatus::SkippedExisting => "skipped",
            };
            let issue = outcome
                .issue_number
                .map(|n| format!(" #{}", n))
                .unwrap_or_default();
            out.push_str(&format!(
                "[{}] [{}] {}{} ({}, {})\n",
                marker, report.date_label, report.deliverable, issue, report.work_type, report.decision
            ));
            for error in &outcome.errors {
                out.push_str(&format!("    {}\n", error));
            }
        }

        out.push_str(&format!(
            "\nDeliverables: {}\n- created: {}\n- added to project: {}\n- field updated: {}\n- failed: {}\n",
            counts.total, counts.created, counts.added_to_project, counts.field_updated, counts.failed
        ));
        if counts.skipped > 0 {
            out.push_str(&format!("- skipped (already tracked): {}\n", counts.skipped));
        }
        out.push_str(&format!(
            "Fully synced: {}, created not enriched: {}, not created: {}\n",
            counts.fully_synced, counts.created_not_enriched, counts.failed
        ));
        out.push_str(&format!("Duration: {} ms\n", self.duration_ms));
        out
    }
}
