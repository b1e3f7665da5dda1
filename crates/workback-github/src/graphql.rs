//! GraphQL documents and response shapes for Projects v2.

use serde::Deserialize;
use workback_core::tracker::TYPE_FIELD_NAME;
use workback_core::{TrackerError, TrackerProject};

/// Project lookup with single-select fields. The owner is aliased to `owner`
/// so organization and user projects share one response shape.
pub const ORGANIZATION_PROJECT_QUERY: &str = r#"
query($login: String!, $number: Int!) {
  owner: organization(login: $login) {
    projectV2(number: $number) {
      id
      fields(first: 50) {
        nodes {
          ... on ProjectV2SingleSelectField { id name options { id name } }
        }
      }
    }
  }
}
"#;

pub const USER_PROJECT_QUERY: &str = r#"
query($login: String!, $number: Int!) {
  owner: user(login: $login) {
    projectV2(number: $number) {
      id
      fields(first: 50) {
        nodes {
          ... on ProjectV2SingleSelectField { id name options { id name } }
        }
      }
    }
  }
}
"#;

pub const ADD_ITEM_MUTATION: &str = r#"
mutation($projectId: ID!, $contentId: ID!) {
  addProjectV2ItemById(input: { projectId: $projectId, contentId: $contentId }) {
    item { id }
  }
}
"#;

pub const UPDATE_FIELD_MUTATION: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $optionId: String!) {
  updateProjectV2ItemFieldValue(
    input: {
      projectId: $projectId
      itemId: $itemId
      fieldId: $fieldId
      value: { singleSelectOptionId: $optionId }
    }
  ) {
    projectV2Item { id }
  }
}
"#;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl GraphQlError {
    pub fn is_not_found(&self) -> bool {
        self.kind.as_deref() == Some("NOT_FOUND")
    }
}

/// Join error messages into one [`TrackerError::GraphQl`].
pub fn graphql_error(errors: &[GraphQlError]) -> TrackerError {
    let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
    TrackerError::GraphQl(messages.join("; "))
}

impl<T> GraphQlResponse<T> {
    /// Data when the response carries no errors.
    pub fn into_data(self) -> Result<T, TrackerError> {
        if !self.errors.is_empty() {
            return Err(graphql_error(&self.errors));
        }
        self.data
            .ok_or_else(|| TrackerError::Decode("GraphQL response without data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct OwnerProjectData {
    pub owner: Option<OwnerNode>,
}

impl GraphQlResponse<OwnerProjectData> {
    pub fn has_project(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|data| data.owner.as_ref())
            .is_some_and(|owner| owner.project_v2.is_some())
    }

    fn into_project_node(self) -> Result<ProjectNode, Vec<GraphQlError>> {
        self.data
            .and_then(|data| data.owner)
            .and_then(|owner| owner.project_v2)
            .ok_or(self.errors)
    }
}

/// Decide a project lookup from the organization response and, when the
/// organization had no such project, the user response.
///
/// GitHub answers an unknown login or project number with a `NOT_FOUND`
/// error and null data, so a lookup where every error is `NOT_FOUND` is
/// `Ok(None)`. Any other error fails the lookup.
pub fn select_project(
    organization: GraphQlResponse<OwnerProjectData>,
    user: Option<GraphQlResponse<OwnerProjectData>>,
) -> Result<Option<TrackerProject>, TrackerError> {
    let mut errors = match organization.into_project_node() {
        Ok(node) => return Ok(Some(parse_project(node))),
        Err(errors) => errors,
    };
    if let Some(user) = user {
        match user.into_project_node() {
            Ok(node) => return Ok(Some(parse_project(node))),
            Err(user_errors) => errors.extend(user_errors),
        }
    }

    errors.retain(|e| !e.is_not_found());
    if errors.is_empty() {
        Ok(None)
    } else {
        Err(graphql_error(&errors))
    }
}

#[derive(Debug, Deserialize)]
pub struct OwnerNode {
    #[serde(rename = "projectV2")]
    pub project_v2: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectNode {
    pub id: String,
    pub fields: FieldConnection,
}

#[derive(Debug, Default, Deserialize)]
pub struct FieldConnection {
    #[serde(default)]
    pub nodes: Vec<Option<FieldNode>>,
}

/// Non single-select fields come back as `{}`.
#[derive(Debug, Default, Deserialize)]
pub struct FieldNode {
    pub id: Option<String>,
    pub name: Option<String>,
    pub options: Option<Vec<FieldOption>>,
}

#[derive(Debug, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddItemData {
    #[serde(rename = "addProjectV2ItemById")]
    pub add_item: Option<AddItemPayload>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemPayload {
    pub item: Option<ItemRef>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRef {
    pub id: String,
}

/// Convert a project node into a [`TrackerProject`], picking up the
/// single-select field named exactly `Type` when present.
pub fn parse_project(node: ProjectNode) -> TrackerProject {
    let type_field = node.fields.nodes.into_iter().flatten().find_map(|field| {
        match (field.id, field.name.as_deref(), field.options) {
            (Some(id), Some(TYPE_FIELD_NAME), Some(options)) => Some((id, options)),
            _ => None,
        }
    });

    let project = TrackerProject::new(node.id);
    match type_field {
        Some((field_id, options)) => {
            project.with_type_field(field_id, options.into_iter().map(|o| (o.name, o.id)))
        }
        None => project,
    }
}
