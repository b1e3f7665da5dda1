//! Run configuration: credentials, target repository and project board.
//!
//! [`SyncConfig`] is the raw, possibly incomplete input (CLI flags or their
//! environment variables).
//! [`SyncConfig::validate`] turns it into a [`ValidatedConfig`] before any
//! tracker call is made.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkbackError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// `owner/name` of the target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepositoryRef {
    type Err = WorkbackError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || {
            WorkbackError::Configuration(format!(
                "repository must be in owner/name form, got '{}'",
                s
            ))
        };
        let (owner, name) = s.trim().split_once('/').ok_or_else(malformed)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(malformed());
        }
        Ok(RepositoryRef {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Project board to attach items to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLookup {
    pub owner: String,
    pub number: u64,
}

impl fmt::Display for ProjectLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner, self.number)
    }
}

/// Unvalidated run configuration.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    pub token: Option<String>,
    /// `owner/name`.
    pub repository: Option<String>,
    /// Defaults to the repository owner when only a number is given.
    pub project_owner: Option<String>,
    pub project_number: Option<u64>,
    /// Defaults to the repository owner.
    pub default_assignee: Option<String>,
    pub skip_existing: bool,
    pub api_url: Option<String>,
}

impl SyncConfig {
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_repository(mut self, repository: &str) -> Self {
        self.repository = Some(repository.to_string());
        self
    }

    pub fn with_project(mut self, owner: Option<&str>, number: u64) -> Self {
        self.project_owner = owner.map(str::to_string);
        self.project_number = Some(number);
        self
    }

    pub fn with_default_assignee(mut self, assignee: &str) -> Self {
        self.default_assignee = Some(assignee.to_string());
        self
    }

    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = Some(api_url.to_string());
        self
    }

    /// Check required fields and apply defaults.
    pub fn validate(self) -> Result<ValidatedConfig> {
        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                WorkbackError::Configuration("missing tracker credential (GITHUB_TOKEN)".to_string())
            })?;
        let repository: RepositoryRef = self
            .repository
            .ok_or_else(|| {
                WorkbackError::Configuration(
                    "missing target repository (GITHUB_REPOSITORY)".to_string(),
                )
            })?
            .parse()?;

        let project = match (self.project_owner, self.project_number) {
            (owner, Some(number)) => Some(ProjectLookup {
                owner: owner.unwrap_or_else(|| repository.owner.clone()),
                number,
            }),
            (Some(owner), None) => {
                return Err(WorkbackError::Configuration(format!(
                    "project owner '{}' given without a project number",
                    owner
                )))
            }
            (None, None) => None,
        };

        Ok(ValidatedConfig {
            token,
            default_assignee: self
                .default_assignee
                .unwrap_or_else(|| repository.owner.clone()),
            repository,
            project,
            skip_existing: self.skip_existing,
            api_url: self
                .api_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }
}

/// Complete configuration for one run.
#[derive(Clone)]
pub struct ValidatedConfig {
    pub token: String,
    pub repository: RepositoryRef,
    pub project: Option<ProjectLookup>,
    pub default_assignee: String,
    pub skip_existing: bool,
    pub api_url: String,
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("token", &"<redacted>")
            .field("repository", &self.repository)
            .field("project", &self.project)
            .field("default_assignee", &self.default_assignee)
            .field("skip_existing", &self.skip_existing)
            .field("api_url", &self.api_url)
            .finish()
    }
}
