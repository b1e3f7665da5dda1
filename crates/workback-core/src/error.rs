//! Error taxonomy for Workback.
//!
//! - [`WorkbackError`]: load-time and run-level failures (configuration,
//!   project resolution, plan and context loading).
//! - [`TrackerError`]: a single failed call against the tracker gateway,
//!   carrying its [`RetryPolicy`].
//! - [`StageError`]: a tracker failure attributed to a synchronization stage.
//!   Creation failures are deliverable-fatal, enrichment failures are not.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::orchestrator::SyncStage;

/// Whether a tracker failure may be retried, and after what delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The call may be retried. `after` is the server-suggested minimum delay.
    Retryable { after: Option<Duration> },
    /// Retrying would produce the same failure.
    NonRetryable,
}

/// Run-level Workback errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkbackError {
    /// Missing credential or target repository. Raised before any tracker call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The project board could not be resolved; the run continues without it.
    #[error("project {owner}#{number} could not be resolved: {reason}")]
    ProjectResolution {
        owner: String,
        number: u64,
        reason: String,
    },

    #[error("invalid release plan: {0}")]
    Plan(String),

    #[error("repository context error: {0}")]
    Context(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for Workback run-level operations.
pub type Result<T> = std::result::Result<T, WorkbackError>;

/// A failed tracker gateway call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("tracker rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("tracker resource not found: {0}")]
    NotFound(String),

    #[error("tracker rejected request: {0}")]
    Validation(String),

    #[error("tracker rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    #[error("tracker returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("tracker transport error: {0}")]
    Transport(String),

    #[error("tracker GraphQL error: {0}")]
    GraphQl(String),

    #[error("unexpected tracker response: {0}")]
    Decode(String),
}

impl TrackerError {
    /// Map an HTTP status and response message onto a tracker error.
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = message.into();
        match status {
            // GitHub signals secondary rate limits as 403 with Retry-After.
            403 if retry_after.is_some() => TrackerError::RateLimited { retry_after },
            401 | 403 => TrackerError::Unauthorized { status },
            429 => TrackerError::RateLimited { retry_after },
            404 => TrackerError::NotFound(message),
            400 | 422 => TrackerError::Validation(message),
            _ => TrackerError::Http { status, message },
        }
    }

    /// Retry classification: rate limits, 5xx and transport failures are retryable.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            TrackerError::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            TrackerError::Http { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            TrackerError::Transport(_) => RetryPolicy::Retryable { after: None },
            _ => RetryPolicy::NonRetryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.retry_policy(), RetryPolicy::Retryable { .. })
    }
}

/// Result type for tracker gateway calls.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// A tracker failure attributed to one synchronization stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// Stage 1 failed; the deliverable has no tracked item.
    #[error("create_item failed: {0}")]
    Creation(TrackerError),

    /// A stage after creation failed; the tracked item exists.
    #[error("{stage} failed: {source}")]
    Enrichment {
        stage: SyncStage,
        #[source]
        source: TrackerError,
    },
}

impl StageError {
    pub fn stage(&self) -> SyncStage {
        match self {
            StageError::Creation(_) => SyncStage::CreateItem,
            StageError::Enrichment { stage, .. } => *stage,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StageError::Creation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(
            TrackerError::from_status(401, "bad credentials", None),
            TrackerError::Unauthorized { status: 401 }
        );
        assert!(matches!(
            TrackerError::from_status(404, "missing", None),
            TrackerError::NotFound(_)
        ));
        assert!(matches!(
            TrackerError::from_status(422, "label too long", None),
            TrackerError::Validation(_)
        ));
        assert!(matches!(
            TrackerError::from_status(502, "bad gateway", None),
            TrackerError::Http { status: 502, .. }
        ));
    }

    #[test]
    fn test_secondary_rate_limit_is_retryable() {
        let err = TrackerError::from_status(403, "secondary rate limit", Some(Duration::from_secs(3)));
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(3))
            }
        );
    }

    #[test]
    fn test_retry_policy() {
        assert!(TrackerError::Transport("reset".to_string()).is_retryable());
        assert!(TrackerError::Http {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!TrackerError::Validation("bad".to_string()).is_retryable());
        assert!(!TrackerError::Unauthorized { status: 401 }.is_retryable());
        assert!(!TrackerError::GraphQl("boom".to_string()).is_retryable());
    }

    #[test]
    fn test_stage_error_display() {
        let err = StageError::Enrichment {
            stage: SyncStage::AddToProject,
            source: TrackerError::NotFound("project".to_string()),
        };
        assert!(err.to_string().contains("add_to_project"));
        assert!(!err.is_fatal());
        assert_eq!(err.stage(), SyncStage::AddToProject);

        let err = StageError::Creation(TrackerError::Unauthorized { status: 403 });
        assert!(err.to_string().contains("create_item"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_workback_error_display() {
        let err = WorkbackError::ProjectResolution {
            owner: "acme".to_string(),
            number: 7,
            reason: "not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("acme#7"));
        assert!(msg.contains("not found"));

        let err = WorkbackError::Configuration("GITHUB_TOKEN is not set".to_string());
        assert!(err.to_string().contains("configuration error"));
    }
}
