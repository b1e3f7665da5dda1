//! End-to-end runs of the driver against the in-memory tracker.

use std::sync::Arc;

use workback_core::fakes::FakeTracker;
use workback_core::{
    AssignmentDecision, ProjectLookup, ProjectStatus, ReleasePlan, RepositoryContext, RunDriver,
    RunOptions, SyncStatus, TrackerProject, WorkType,
};

const PLAN_YAML: &str = r#"
release:
  name: "v2.0 Portal"
  description: "Customer portal relaunch"
  workback_schedule:
    - date: "Week 1"
      deliverables:
        - "Implement login API endpoint"
        - "Add billing export"
        - "Setup deploy pipeline"
    - date: "Week 2"
      deliverables:
        - "Design the database schema"
"#;

fn plan() -> ReleasePlan {
    ReleasePlan::from_yaml_str(PLAN_YAML).expect("valid plan")
}

fn context() -> RepositoryContext {
    RepositoryContext::new()
        .with_framework("express")
        .with_auth("passport")
}

fn project() -> TrackerProject {
    TrackerProject::new("PVT_board").with_type_field(
        "FIELD_TYPE",
        vec![
            ("Feature".to_string(), "OPT_FEATURE".to_string()),
            ("Task".to_string(), "OPT_TASK".to_string()),
        ],
    )
}

fn lookup() -> ProjectLookup {
    ProjectLookup {
        owner: "acme".to_string(),
        number: 4,
    }
}

fn driver(tracker: Arc<FakeTracker>) -> RunDriver {
    RunDriver::new(
        tracker,
        RunOptions {
            default_assignee: "octo-lead".to_string(),
            skip_existing: false,
        },
    )
}

#[tokio::test]
async fn full_run_attaches_every_item_to_the_project() {
    let tracker = Arc::new(FakeTracker::new().with_project("acme", 4, project()));

    let summary = driver(tracker.clone())
        .run(&plan(), &context(), Some(&lookup()))
        .await;

    assert_eq!(
        summary.project,
        ProjectStatus::Attached {
            project_id: "PVT_board".to_string()
        }
    );
    let counts = summary.counts();
    assert_eq!(counts.total, 4);
    assert_eq!(counts.created, 4);
    assert_eq!(counts.added_to_project, 4);
    assert_eq!(counts.field_updated, 4);
    assert_eq!(counts.fully_synced, 4);

    let options: Vec<_> = tracker
        .field_updates()
        .into_iter()
        .map(|(_, _, option)| option)
        .collect();
    assert_eq!(
        options,
        vec!["OPT_FEATURE", "OPT_FEATURE", "OPT_TASK", "OPT_TASK"]
    );
}

#[tokio::test]
async fn create_failure_does_not_stop_later_deliverables() {
    let tracker = Arc::new(
        FakeTracker::new()
            .with_project("acme", 4, project())
            .fail_create_for("billing"),
    );

    let summary = driver(tracker.clone())
        .run(&plan(), &context(), Some(&lookup()))
        .await;

    let statuses: Vec<_> = summary
        .deliverables
        .iter()
        .map(|r| r.outcome.status())
        .collect();
    assert_eq!(
        statuses,
        vec![
            SyncStatus::FullySynced,
            SyncStatus::NotCreated,
            SyncStatus::FullySynced,
            SyncStatus::FullySynced,
        ]
    );
    assert_eq!(summary.counts().failed, 1);
    assert_eq!(tracker.created_items().len(), 3);
}

#[tokio::test]
async fn add_to_project_failure_leaves_items_created() {
    let tracker = Arc::new(
        FakeTracker::new()
            .with_project("acme", 4, project())
            .fail_add_to_project(),
    );

    let summary = driver(tracker.clone())
        .run(&plan(), &context(), Some(&lookup()))
        .await;

    for report in &summary.deliverables {
        assert!(report.outcome.created);
        assert!(!report.outcome.added_to_project);
        assert!(!report.outcome.field_updated);
        assert_eq!(report.outcome.errors.len(), 1);
    }
    assert_eq!(summary.counts().created_not_enriched, 4);
    assert!(tracker.field_updates().is_empty());
}

#[tokio::test]
async fn unresolvable_project_degrades_to_creation_only() {
    let tracker = Arc::new(FakeTracker::new().fail_project_resolution());

    let summary = driver(tracker.clone())
        .run(&plan(), &context(), Some(&lookup()))
        .await;

    assert!(summary.project_unavailable());
    assert_eq!(summary.counts().created, 4);
    assert_eq!(summary.counts().added_to_project, 0);
    assert!(!tracker.calls().contains(&"add_to_project"));
}

#[tokio::test]
async fn endpoint_deliverable_needs_clarification_and_an_owner() {
    let tracker = Arc::new(FakeTracker::new());

    let summary = driver(tracker.clone()).run(&plan(), &context(), None).await;

    let login = &summary.deliverables[0];
    assert_eq!(login.deliverable, "Implement login API endpoint");
    assert_eq!(login.work_type, WorkType::Feature);
    assert_eq!(login.decision, AssignmentDecision::NeedsClarification);
    assert_eq!(login.confidence, 30);

    let created = tracker.created_items();
    let item = &created[0];
    assert_eq!(item.title, "[Week 1] Implement login API endpoint");
    assert!(item.labels.contains("needs-clarification"));
    assert!(item.labels.contains("missing-requirements"));
    assert!(item.labels.contains("release:v2-0-portal"));
    assert!(item.assignees.contains("octo-lead"));
    assert!(item.body.contains("api_endpoint_specifications"));
}

#[tokio::test]
async fn automatable_items_are_unassigned() {
    let tracker = Arc::new(FakeTracker::new());

    let summary = driver(tracker.clone()).run(&plan(), &context(), None).await;

    let billing = &summary.deliverables[1];
    assert_eq!(billing.decision, AssignmentDecision::Automatable);
    let created = tracker.created_items();
    assert!(created[1].assignees.is_empty());
    assert!(created[1].labels.contains("copilot-ready"));

    let design = &summary.deliverables[3];
    assert_eq!(design.decision, AssignmentDecision::HumanRequired);
    assert!(created[3].labels.contains("needs-design"));
}

#[tokio::test]
async fn skip_existing_avoids_duplicate_items() {
    let prepared = RunDriver::prepare(&plan(), &context(), "octo-lead");
    let fingerprint = prepared[0]
        .item
        .fingerprint
        .clone()
        .expect("items carry a fingerprint");
    let tracker = Arc::new(FakeTracker::new().with_existing_fingerprint(&fingerprint, 17));
    let driver = RunDriver::new(
        tracker.clone(),
        RunOptions {
            default_assignee: "octo-lead".to_string(),
            skip_existing: true,
        },
    );

    let summary = driver.run(&plan(), &context(), None).await;

    assert_eq!(summary.deliverables[0].outcome.issue_number, Some(17));
    assert_eq!(summary.counts().skipped, 1);
    assert_eq!(summary.counts().created, 3);
    assert_eq!(tracker.created_items().len(), 3);
}

#[tokio::test]
async fn empty_schedule_runs_cleanly() {
    let plan = ReleasePlan::from_yaml_str("release:\n  name: \"v0\"\n").expect("valid plan");
    let tracker = Arc::new(FakeTracker::new());

    let summary = driver(tracker.clone()).run(&plan, &context(), None).await;

    assert!(summary.deliverables.is_empty());
    assert!(tracker.calls().is_empty());
}
