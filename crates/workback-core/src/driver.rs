//! Run driver: triage every deliverable in a release plan and synchronize it.
//!
//! Deliverables are processed sequentially in plan order. A failure is
//! confined to its deliverable; the driver always returns a [`RunSummary`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, Instrument};

use crate::analyzer::{analyze, AssignabilityResult};
use crate::classifier::{classify, Classification};
use crate::config::ProjectLookup;
use crate::context::RepositoryContext;
use crate::error::{Result, WorkbackError};
use crate::obs;
use crate::orchestrator::SyncOrchestrator;
use crate::plan::ReleasePlan;
use crate::render::{build_item, ItemInput};
use crate::summary::{DeliverableReport, ProjectStatus, RunSummary};
use crate::tracker::{TrackerGateway, TrackerItem, TrackerProject};

/// Triage result for one deliverable, ready to synchronize.
#[derive(Debug, Clone)]
pub struct PreparedDeliverable {
    pub date_label: String,
    pub text: String,
    pub classification: Classification,
    pub assessment: AssignabilityResult,
    pub item: TrackerItem,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Human owner for items that are not automatable.
    pub default_assignee: String,
    pub skip_existing: bool,
}

pub struct RunDriver {
    gateway: Arc<dyn TrackerGateway>,
    orchestrator: SyncOrchestrator,
    options: RunOptions,
}

impl RunDriver {
    pub fn new(gateway: Arc<dyn TrackerGateway>, options: RunOptions) -> Self {
        let orchestrator =
            SyncOrchestrator::new(gateway.clone()).with_skip_existing(options.skip_existing);
        Self {
            gateway,
            orchestrator,
            options,
        }
    }

    /// Classify, analyze and render every deliverable without touching the tracker.
    pub fn prepare(
        plan: &ReleasePlan,
        context: &RepositoryContext,
        default_assignee: &str,
    ) -> Vec<PreparedDeliverable> {
        plan.deliverables()
            .map(|(date_label, text)| {
                let classification = classify(text);
                let assessment = analyze(text, context);
                let item = build_item(&ItemInput {
                    plan,
                    date_label,
                    deliverable: text,
                    classification: &classification,
                    assessment: &assessment,
                    default_assignee,
                });
                PreparedDeliverable {
                    date_label: date_label.to_string(),
                    text: text.to_string(),
                    classification,
                    assessment,
                    item,
                }
            })
            .collect()
    }

    /// Resolve the project board once for the run.
    pub async fn resolve_project(&self, lookup: &ProjectLookup) -> Result<TrackerProject> {
        let resolution_error = |reason: String| WorkbackError::ProjectResolution {
            owner: lookup.owner.clone(),
            number: lookup.number,
            reason,
        };
        match self
            .gateway
            .resolve_project(&lookup.owner, lookup.number)
            .await
        {
            Ok(Some(project)) => Ok(project),
            Ok(None) => Err(resolution_error("project not found".to_string())),
            Err(e) => Err(resolution_error(e.to_string())),
        }
    }

    /// Synchronize every deliverable of `plan`.
    ///
    /// An unresolvable project degrades the run to item creation only and is
    /// reported as [`ProjectStatus::Unavailable`].
    pub async fn run(
        &self,
        plan: &ReleasePlan,
        context: &RepositoryContext,
        lookup: Option<&ProjectLookup>,
    ) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(&plan.name, ProjectStatus::NotRequested);
        let span = obs::run_span(&summary.run_id.to_string(), &plan.name);

        async {
            obs::emit_run_started(
                &summary.run_id.to_string(),
                &plan.name,
                plan.deliverable_count(),
            );

            let project = match lookup {
                None => None,
                Some(lookup) => match self.resolve_project(lookup).await {
                    Ok(project) => {
                        info!(
                            project_id = %project.id,
                            has_type_field = project.custom_field_id.is_some(),
                            "Resolved project"
                        );
                        summary.project = ProjectStatus::Attached {
                            project_id: project.id.clone(),
                        };
                        Some(project)
                    }
                    Err(e) => {
                        obs::emit_project_unavailable(
                            &lookup.owner,
                            lookup.number,
                            &e.to_string(),
                        );
                        summary.project = ProjectStatus::Unavailable {
                            reason: e.to_string(),
                        };
                        None
                    }
                },
            };

            for prepared in Self::prepare(plan, context, &self.options.default_assignee) {
                let PreparedDeliverable {
                    date_label,
                    text,
                    classification,
                    assessment,
                    mut item,
                } = prepared;

                let outcome = self
                    .orchestrator
                    .sync(&mut item, classification.work_type, project.as_ref())
                    .await;
                obs::emit_deliverable_synced(
                    &item.title,
                    outcome.status(),
                    outcome.issue_number,
                );

                summary.deliverables.push(DeliverableReport {
                    date_label,
                    deliverable: text,
                    work_type: classification.work_type,
                    decision: assessment.decision,
                    confidence: assessment.confidence,
                    outcome,
                });
            }

            summary.duration_ms = started.elapsed().as_millis() as u64;
            let counts = summary.counts();
            obs::emit_run_finished(
                &summary.run_id.to_string(),
                summary.duration_ms,
                counts.created,
                counts.failed,
            );
        }
        .instrument(span)
        .await;

        summary
    }
}
