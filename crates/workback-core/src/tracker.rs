//! Tracker gateway port and tracker-side records.
//!
//! The gateway is the only seam to the issue tracker. Implementations own
//! authentication and transport; the orchestrator sees only these calls.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classifier::WorkType;
use crate::error::TrackerResult;

/// Name of the single-select project field that receives the work type.
pub const TYPE_FIELD_NAME: &str = "Type";

/// Project board resolved once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerProject {
    pub id: String,
    /// Id of the single-select field named [`TYPE_FIELD_NAME`], when present.
    pub custom_field_id: Option<String>,
    /// Option name to option id for that field.
    pub field_option_ids: BTreeMap<String, String>,
}

impl TrackerProject {
    pub fn new(id: impl Into<String>) -> Self {
        TrackerProject {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_type_field(
        mut self,
        field_id: impl Into<String>,
        options: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.custom_field_id = Some(field_id.into());
        self.field_option_ids = options.into_iter().collect();
        self
    }

    /// Option id for `work_type`, matched case-insensitively by option name.
    pub fn option_for(&self, work_type: WorkType) -> Option<&str> {
        self.field_option_ids
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(work_type.name()))
            .map(|(_, id)| id.as_str())
    }
}

/// A tracked item: submitted fields plus identifiers discovered while syncing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerItem {
    pub title: String,
    pub body: String,
    pub labels: BTreeSet<String>,
    pub assignees: BTreeSet<String>,
    /// Stable deliverable fingerprint embedded in the body.
    pub fingerprint: Option<String>,

    pub issue_id: Option<u64>,
    pub issue_number: Option<u64>,
    pub issue_node_id: Option<String>,
    pub project_item_id: Option<String>,
    pub url: Option<String>,
}

impl TrackerItem {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        TrackerItem {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Identifiers returned by a successful create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItem {
    pub issue_id: u64,
    pub issue_number: u64,
    /// Global node id, when the create response already carries it.
    pub node_id: Option<String>,
    pub url: Option<String>,
}

/// Operations the synchronization pipeline needs from the tracker.
///
/// Inject the GitHub implementation, a retrying decorator around it, or an
/// in-memory fake for tests.
#[async_trait]
pub trait TrackerGateway: Send + Sync {
    /// Resolve a project board by owner and number. `None` when it does not exist.
    async fn resolve_project(&self, owner: &str, number: u64)
        -> TrackerResult<Option<TrackerProject>>;

    /// Create a tracked item from the submitted fields of `item`.
    async fn create_item(&self, item: &TrackerItem) -> TrackerResult<CreatedItem>;

    /// Resolve the global node id of an item by its number.
    async fn resolve_node_identifier(&self, issue_number: u64) -> TrackerResult<Option<String>>;

    /// Attach content to a project board, returning the project item id.
    async fn add_to_project(
        &self,
        project_id: &str,
        content_id: &str,
    ) -> TrackerResult<Option<String>>;

    /// Set a single-select field on a project item.
    async fn set_single_select_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> TrackerResult<()>;

    /// Find an existing item whose body carries `fingerprint`.
    async fn find_item_by_fingerprint(&self, _fingerprint: &str) -> TrackerResult<Option<u64>> {
        Ok(None)
    }
}
