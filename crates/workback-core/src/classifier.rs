//! Deliverable work-type classification.
//!
//! Keyword scoring over the lowercased deliverable text. Each keyword counts
//! once if it occurs anywhere as a substring; there is no tokenizing or
//! stemming. Ties, including zero matches on both sides, classify as
//! [`WorkType::Task`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bumped whenever either keyword table changes.
pub const KEYWORD_TABLE_VERSION: u32 = 1;

/// Feature indicators.
pub const FEATURE_KEYWORDS: &[&str] = &[
    "add",
    "implement",
    "create",
    "build",
    "design",
    "develop",
    "feature",
    "interface",
    "api",
    "endpoint",
    "component",
];

/// Task indicators. Disjoint from [`FEATURE_KEYWORDS`].
pub const TASK_KEYWORDS: &[&str] = &[
    "setup",
    "configure",
    "deploy",
    "test",
    "fix",
    "migrate",
    "refactor",
    "document",
    "schema",
    "infrastructure",
    "pipeline",
];

/// Work type assigned to a deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Feature,
    Task,
}

impl WorkType {
    /// Display name, also used to match project field options.
    pub fn name(&self) -> &'static str {
        match self {
            WorkType::Feature => "Feature",
            WorkType::Task => "Task",
        }
    }

    /// Tracker label for this work type.
    pub fn label(&self) -> &'static str {
        match self {
            WorkType::Feature => "type:feature",
            WorkType::Task => "type:task",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of a single deliverable, with the scores that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub work_type: WorkType,
    pub feature_score: usize,
    pub task_score: usize,
}

/// Number of distinct keywords from `keywords` occurring in `lowered`.
pub fn keyword_score(lowered: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| lowered.contains(*kw)).count()
}

/// Classify a deliverable as feature or task work.
pub fn classify(text: &str) -> Classification {
    let lowered = text.to_lowercase();
    let feature_score = keyword_score(&lowered, FEATURE_KEYWORDS);
    let task_score = keyword_score(&lowered, TASK_KEYWORDS);

    let work_type = if task_score >= feature_score {
        WorkType::Task
    } else {
        WorkType::Feature
    };

    Classification {
        work_type,
        feature_score,
        task_score,
    }
}
