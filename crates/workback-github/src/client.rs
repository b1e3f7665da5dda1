//! GitHub implementation of [`TrackerGateway`].
//!
//! Issues go through the REST API; project boards through GraphQL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use workback_core::render::FINGERPRINT_MARKER;
use workback_core::{
    CreatedItem, TrackerError, TrackerGateway, TrackerItem, TrackerProject, TrackerResult,
};

use crate::config::GitHubConfig;
use crate::graphql::{
    select_project, AddItemData, GraphQlResponse, OwnerProjectData, ADD_ITEM_MUTATION,
    ORGANIZATION_PROJECT_QUERY, UPDATE_FIELD_MUTATION, USER_PROJECT_QUERY,
};

const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";

#[derive(Debug, Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<&'a str>,
}

impl<'a> From<&'a TrackerItem> for NewIssue<'a> {
    fn from(item: &'a TrackerItem) -> Self {
        NewIssue {
            title: &item.title,
            body: &item.body,
            labels: item.labels.iter().map(String::as_str).collect(),
            assignees: item.assignees.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    id: u64,
    number: u64,
    node_id: Option<String>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
}

/// GitHub Issues + Projects v2 gateway.
pub struct GitHubGateway {
    config: GitHubConfig,
    http: Client,
}

impl GitHubGateway {
    pub fn new(config: GitHubConfig) -> TrackerResult<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| TrackerError::Transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(ACCEPT, MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> TrackerResult<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| TrackerError::Decode(e.to_string()))
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> TrackerResult<GraphQlResponse<T>> {
        let request = self
            .http
            .post(self.config.graphql_url())
            .json(&json!({ "query": query, "variables": variables }));
        self.send_json(request).await
    }

    async fn project_for(
        &self,
        query: &str,
        owner: &str,
        number: u64,
    ) -> TrackerResult<GraphQlResponse<OwnerProjectData>> {
        self.graphql(query, json!({ "login": owner, "number": number }))
            .await
    }
}

#[async_trait]
impl TrackerGateway for GitHubGateway {
    async fn resolve_project(
        &self,
        owner: &str,
        number: u64,
    ) -> TrackerResult<Option<TrackerProject>> {
        let organization = self
            .project_for(ORGANIZATION_PROJECT_QUERY, owner, number)
            .await?;
        let user = if organization.has_project() {
            None
        } else {
            Some(self.project_for(USER_PROJECT_QUERY, owner, number).await?)
        };

        let project = select_project(organization, user)?;
        if project.is_none() {
            debug!(owner = owner, number = number, "Project not found");
        }
        Ok(project)
    }

    async fn create_item(&self, item: &TrackerItem) -> TrackerResult<CreatedItem> {
        let request = self
            .http
            .post(self.config.repo_url("/issues"))
            .json(&NewIssue::from(item));
        let issue: IssueResponse = self.send_json(request).await?;
        Ok(CreatedItem {
            issue_id: issue.id,
            issue_number: issue.number,
            node_id: issue.node_id,
            url: issue.html_url,
        })
    }

    async fn resolve_node_identifier(&self, issue_number: u64) -> TrackerResult<Option<String>> {
        let request = self
            .http
            .get(self.config.repo_url(&format!("/issues/{}", issue_number)));
        match self.send_json::<IssueResponse>(request).await {
            Ok(issue) => Ok(issue.node_id),
            Err(TrackerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn add_to_project(
        &self,
        project_id: &str,
        content_id: &str,
    ) -> TrackerResult<Option<String>> {
        let data: AddItemData = self
            .graphql(
                ADD_ITEM_MUTATION,
                json!({ "projectId": project_id, "contentId": content_id }),
            )
            .await?
            .into_data()?;
        Ok(data.add_item.and_then(|p| p.item).map(|item| item.id))
    }

    async fn set_single_select_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> TrackerResult<()> {
        self.graphql::<Value>(
            UPDATE_FIELD_MUTATION,
            json!({
                "projectId": project_id,
                "itemId": item_id,
                "fieldId": field_id,
                "optionId": option_id,
            }),
        )
        .await?
        .into_data()?;
        Ok(())
    }

    async fn find_item_by_fingerprint(&self, fingerprint: &str) -> TrackerResult<Option<u64>> {
        let request = self
            .http
            .get(format!("{}/search/issues", self.config.api_url))
            .query(&[
                ("q", fingerprint_query(&self.config, fingerprint)),
                ("per_page", "1".to_string()),
            ]);
        let found: SearchResponse = self.send_json(request).await?;
        Ok(found.items.first().map(|item| item.number))
    }
}

fn fingerprint_query(config: &GitHubConfig, fingerprint: &str) -> String {
    format!(
        "repo:{}/{} is:issue in:body \"{}{}\"",
        config.owner, config.repo, FINGERPRINT_MARKER, fingerprint
    )
}

fn transport_error(e: reqwest::Error) -> TrackerError {
    TrackerError::Transport(e.to_string())
}

async fn check_status(response: Response) -> TrackerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::from_status(
        status.as_u16(),
        error_message(&body),
        retry_after,
    ))
}

/// `Retry-After` in seconds, when present and numeric.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// GitHub error bodies carry a `message`; fall back to a truncated raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::collections::BTreeSet;

    #[test]
    fn test_new_issue_payload() {
        let mut item = TrackerItem::new("[Week 1] Add search", "body");
        item.labels = BTreeSet::from(["workback".to_string(), "type:feature".to_string()]);
        let payload = serde_json::to_value(NewIssue::from(&item)).unwrap();

        assert_eq!(payload["title"], "[Week 1] Add search");
        assert_eq!(payload["labels"], json!(["type:feature", "workback"]));
        assert!(payload.get("assignees").is_none());
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(30)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message":"Validation Failed","errors":[]}"#),
            "Validation Failed"
        );
        assert_eq!(error_message("plain failure"), "plain failure");
        assert_eq!(error_message(&"x".repeat(500)).len(), 200);
    }

    #[test]
    fn test_fingerprint_query() {
        let config = GitHubConfig::new("t", "acme", "portal");
        assert_eq!(
            fingerprint_query(&config, "abc123"),
            "repo:acme/portal is:issue in:body \"workback-fingerprint:abc123\""
        );
    }

    #[test]
    fn test_issue_response_decoding() {
        let issue: IssueResponse = serde_json::from_value(json!({
            "id": 9001,
            "number": 12,
            "node_id": "I_kwDO",
            "html_url": "https://github.com/acme/portal/issues/12",
            "state": "open"
        }))
        .unwrap();
        assert_eq!(issue.number, 12);
        assert_eq!(issue.node_id.as_deref(), Some("I_kwDO"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_retryable_transport_error() {
        let config = GitHubConfig::new("t", "acme", "portal")
            .with_api_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let gateway = GitHubGateway::new(config).unwrap();

        let err = gateway
            .create_item(&TrackerItem::new("Add search", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::Transport(_)));
        assert!(err.is_retryable());
    }
}
