//! Best-effort synchronization of one tracked item.
//!
//! | Stage | Runs when | On failure |
//! |-------|-----------|------------|
//! | create item | always | deliverable-fatal, nothing else runs |
//! | resolve node id | created, project present | skip add and field update |
//! | add to project | node id known | skip field update |
//! | update field | added, Type field and matching option present | recorded |
//!
//! Only creation decides whether a deliverable synchronized. Enrichment
//! failures are recorded on the [`SyncOutcome`] and never returned as errors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::WorkType;
use crate::error::{StageError, TrackerError};
use crate::obs::emit_stage_failed;
use crate::tracker::{TrackerGateway, TrackerItem, TrackerProject};

/// Synchronization stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    CreateItem,
    ResolveNodeId,
    AddToProject,
    UpdateField,
}

impl SyncStage {
    pub fn name(&self) -> &'static str {
        match self {
            SyncStage::CreateItem => "create_item",
            SyncStage::ResolveNodeId => "resolve_node_id",
            SyncStage::AddToProject => "add_to_project",
            SyncStage::UpdateField => "update_field",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse result of synchronizing one deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Created with no enrichment failures.
    FullySynced,
    /// Created, but at least one enrichment stage failed.
    CreatedNotEnriched,
    /// Creation failed.
    NotCreated,
    /// An item with the same fingerprint already existed.
    SkippedExisting,
}

/// Per-deliverable synchronization record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub created: bool,
    pub added_to_project: bool,
    pub field_updated: bool,
    pub skipped_existing: bool,
    pub issue_number: Option<u64>,
    pub url: Option<String>,
    /// Stage failures in the order they occurred.
    pub errors: Vec<String>,
}

impl SyncOutcome {
    pub fn status(&self) -> SyncStatus {
        if self.skipped_existing {
            SyncStatus::SkippedExisting
        } else if !self.created {
            SyncStatus::NotCreated
        } else if self.errors.is_empty() {
            SyncStatus::FullySynced
        } else {
            SyncStatus::CreatedNotEnriched
        }
    }

    fn record(&mut self, err: StageError) {
        self.errors.push(err.to_string());
    }
}

/// Drives tracked items through the synchronization stages.
pub struct SyncOrchestrator {
    gateway: Arc<dyn TrackerGateway>,
    skip_existing: bool,
}

impl SyncOrchestrator {
    pub fn new(gateway: Arc<dyn TrackerGateway>) -> Self {
        Self {
            gateway,
            skip_existing: false,
        }
    }

    /// Look up the item fingerprint before creating and skip known items.
    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    /// Synchronize `item`, filling in tracker identifiers as they are discovered.
    ///
    /// `project` of `None` means no project integration for this run.
    pub async fn sync(
        &self,
        item: &mut TrackerItem,
        work_type: WorkType,
        project: Option<&TrackerProject>,
    ) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        if self.skip_existing {
            if let Some(existing) = self.find_existing(item).await {
                info!(title = %item.title, issue = existing, "Skipping already synchronized deliverable");
                item.issue_number = Some(existing);
                outcome.skipped_existing = true;
                outcome.issue_number = Some(existing);
                return outcome;
            }
        }

        // Stage 1: create
        let created = match self.gateway.create_item(item).await {
            Ok(created) => created,
            Err(e) => {
                let err = StageError::Creation(e);
                emit_stage_failed(&item.title, &err);
                outcome.record(err);
                return outcome;
            }
        };
        item.issue_id = Some(created.issue_id);
        item.issue_number = Some(created.issue_number);
        item.url = created.url.clone();
        outcome.created = true;
        outcome.issue_number = Some(created.issue_number);
        outcome.url = created.url;
        info!(title = %item.title, issue = created.issue_number, "Created tracked item");

        let Some(project) = project else {
            debug!(title = %item.title, "No project integration; skipping enrichment");
            return outcome;
        };

        // Stage 2: node id
        let node_id = match created.node_id {
            Some(node_id) => Ok(node_id),
            None => self.resolve_node_id(created.issue_number).await,
        };
        let node_id = match node_id {
            Ok(node_id) => node_id,
            Err(err) => {
                emit_stage_failed(&item.title, &err);
                outcome.record(err);
                return outcome;
            }
        };
        item.issue_node_id = Some(node_id.clone());

        // Stage 3: add to project
        let project_item_id = match self.gateway.add_to_project(&project.id, &node_id).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                let err = enrichment(
                    SyncStage::AddToProject,
                    TrackerError::NotFound(format!("no project item returned for {}", node_id)),
                );
                emit_stage_failed(&item.title, &err);
                outcome.record(err);
                return outcome;
            }
            Err(e) => {
                let err = enrichment(SyncStage::AddToProject, e);
                emit_stage_failed(&item.title, &err);
                outcome.record(err);
                return outcome;
            }
        };
        item.project_item_id = Some(project_item_id.clone());
        outcome.added_to_project = true;

        // Stage 4: Type field
        let (Some(field_id), Some(option_id)) =
            (project.custom_field_id.as_deref(), project.option_for(work_type))
        else {
            debug!(
                title = %item.title,
                work_type = %work_type,
                "Project has no matching Type field option; skipping field update"
            );
            return outcome;
        };

        match self
            .gateway
            .set_single_select_field(&project.id, &project_item_id, field_id, option_id)
            .await
        {
            Ok(()) => outcome.field_updated = true,
            Err(e) => {
                let err = enrichment(SyncStage::UpdateField, e);
                emit_stage_failed(&item.title, &err);
                outcome.record(err);
            }
        }

        outcome
    }

    async fn resolve_node_id(&self, issue_number: u64) -> Result<String, StageError> {
        match self.gateway.resolve_node_identifier(issue_number).await {
            Ok(Some(node_id)) => Ok(node_id),
            Ok(None) => Err(enrichment(
                SyncStage::ResolveNodeId,
                TrackerError::NotFound(format!("node id for issue #{}", issue_number)),
            )),
            Err(e) => Err(enrichment(SyncStage::ResolveNodeId, e)),
        }
    }

    async fn find_existing(&self, item: &TrackerItem) -> Option<u64> {
        let fingerprint = item.fingerprint.as_deref()?;
        match self.gateway.find_item_by_fingerprint(fingerprint).await {
            Ok(found) => found,
            Err(e) => {
                warn!(title = %item.title, error = %e, "Fingerprint lookup failed; creating anyway");
                None
            }
        }
    }
}

fn enrichment(stage: SyncStage, source: TrackerError) -> StageError {
    StageError::Enrichment { stage, source }
}
