//! In-memory tracker fake (testing only)
//!
//! [`FakeTracker`] satisfies the [`TrackerGateway`] contract without any
//! network access and supports per-operation failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{TrackerError, TrackerResult};
use crate::tracker::{CreatedItem, TrackerGateway, TrackerItem, TrackerProject};

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<&'static str>,
    created: Vec<TrackerItem>,
    field_updates: Vec<(String, String, String)>,
    transient_create_failures: u32,
    transport_create_failures: u32,
}

/// In-memory tracker with failure injection.
#[derive(Debug, Default)]
pub struct FakeTracker {
    state: Mutex<FakeState>,
    projects: HashMap<(String, u64), TrackerProject>,
    fail_project_resolution: bool,
    fail_create_titles: HashSet<String>,
    fail_node_resolution: bool,
    fail_add_to_project: bool,
    fail_field_update: bool,
    node_ids_on_create: bool,
    existing: HashMap<String, u64>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project resolvable as `owner#number`.
    pub fn with_project(mut self, owner: &str, number: u64, project: TrackerProject) -> Self {
        self.projects.insert((owner.to_string(), number), project);
        self
    }

    pub fn fail_project_resolution(mut self) -> Self {
        self.fail_project_resolution = true;
        self
    }

    /// Fail creation for items whose title contains `needle`.
    pub fn fail_create_for(mut self, needle: &str) -> Self {
        self.fail_create_titles.insert(needle.to_string());
        self
    }

    /// Fail the next `count` create calls with a retryable error.
    pub fn fail_create_transiently(self, count: u32) -> Self {
        self.state.lock().unwrap().transient_create_failures = count;
        self
    }

    /// Fail the next `count` create calls with a transport error.
    pub fn fail_create_in_transport(self, count: u32) -> Self {
        self.state.lock().unwrap().transport_create_failures = count;
        self
    }

    pub fn fail_node_resolution(mut self) -> Self {
        self.fail_node_resolution = true;
        self
    }

    pub fn fail_add_to_project(mut self) -> Self {
        self.fail_add_to_project = true;
        self
    }

    pub fn fail_field_update(mut self) -> Self {
        self.fail_field_update = true;
        self
    }

    /// Return node ids directly from create calls.
    pub fn with_node_ids_on_create(mut self) -> Self {
        self.node_ids_on_create = true;
        self
    }

    pub fn with_existing_fingerprint(mut self, fingerprint: &str, issue_number: u64) -> Self {
        self.existing.insert(fingerprint.to_string(), issue_number);
        self
    }

    /// Gateway operations in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Items that were successfully created, in creation order.
    pub fn created_items(&self) -> Vec<TrackerItem> {
        self.state.lock().unwrap().created.clone()
    }

    /// `(project_id, field_id, option_id)` for each successful field update.
    pub fn field_updates(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().field_updates.clone()
    }

    fn record_call(&self, op: &'static str) {
        self.state.lock().unwrap().calls.push(op);
    }
}

#[async_trait]
impl TrackerGateway for FakeTracker {
    async fn resolve_project(
        &self,
        owner: &str,
        number: u64,
    ) -> TrackerResult<Option<TrackerProject>> {
        self.record_call("resolve_project");
        if self.fail_project_resolution {
            return Err(TrackerError::GraphQl("project query failed".to_string()));
        }
        Ok(self.projects.get(&(owner.to_string(), number)).cloned())
    }

    async fn create_item(&self, item: &TrackerItem) -> TrackerResult<CreatedItem> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_item");

        if state.transient_create_failures > 0 {
            state.transient_create_failures -= 1;
            return Err(TrackerError::Http {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        if state.transport_create_failures > 0 {
            state.transport_create_failures -= 1;
            return Err(TrackerError::Transport("operation timed out".to_string()));
        }
        if self
            .fail_create_titles
            .iter()
            .any(|needle| item.title.contains(needle.as_str()))
        {
            return Err(TrackerError::Validation(format!(
                "cannot create '{}'",
                item.title
            )));
        }

        let number = state.created.len() as u64 + 1;
        let mut stored = item.clone();
        stored.issue_id = Some(1000 + number);
        stored.issue_number = Some(number);
        state.created.push(stored);

        Ok(CreatedItem {
            issue_id: 1000 + number,
            issue_number: number,
            node_id: self.node_ids_on_create.then(|| format!("I_{}", number)),
            url: Some(format!("https://tracker.test/issues/{}", number)),
        })
    }

    async fn resolve_node_identifier(&self, issue_number: u64) -> TrackerResult<Option<String>> {
        self.record_call("resolve_node_identifier");
        if self.fail_node_resolution {
            return Ok(None);
        }
        Ok(Some(format!("I_{}", issue_number)))
    }

    async fn add_to_project(
        &self,
        project_id: &str,
        content_id: &str,
    ) -> TrackerResult<Option<String>> {
        self.record_call("add_to_project");
        if self.fail_add_to_project {
            return Err(TrackerError::Unauthorized { status: 403 });
        }
        Ok(Some(format!("PVTI_{}_{}", project_id, content_id)))
    }

    async fn set_single_select_field(
        &self,
        project_id: &str,
        _item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> TrackerResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("set_single_select_field");
        if self.fail_field_update {
            return Err(TrackerError::GraphQl("field update rejected".to_string()));
        }
        state.field_updates.push((
            project_id.to_string(),
            field_id.to_string(),
            option_id.to_string(),
        ));
        Ok(())
    }

    async fn find_item_by_fingerprint(&self, fingerprint: &str) -> TrackerResult<Option<u64>> {
        self.record_call("find_item_by_fingerprint");
        Ok(self.existing.get(fingerprint).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_sequential_numbers() {
        let tracker = FakeTracker::new();
        let a = tracker.create_item(&TrackerItem::new("a", "")).await.unwrap();
        let b = tracker.create_item(&TrackerItem::new("b", "")).await.unwrap();
        assert_eq!(a.issue_number, 1);
        assert_eq!(b.issue_number, 2);
        assert!(a.node_id.is_none());
        assert_eq!(tracker.created_items().len(), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_consumed() {
        let tracker = FakeTracker::new().fail_create_transiently(1);
        let first = tracker.create_item(&TrackerItem::new("a", "")).await;
        assert!(first.unwrap_err().is_retryable());
        assert!(tracker.create_item(&TrackerItem::new("a", "")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_project_resolves_to_none() {
        let tracker = FakeTracker::new().with_project("acme", 1, TrackerProject::new("PVT_1"));
        assert!(tracker.resolve_project("acme", 2).await.unwrap().is_none());
        assert_eq!(
            tracker.resolve_project("acme", 1).await.unwrap().unwrap().id,
            "PVT_1"
        );
    }
}
