//! Release plan model and loading.
//!
//! A release plan is a named release with a dated workback schedule. Plans
//! are loaded from YAML or JSON documents of the form:
//!
//! ```yaml
//! release:
//!   name: "v2.0"
//!   description: "Customer portal relaunch"
//!   workback_schedule:
//!     - date: "Week 1"
//!       deliverables:
//!         - "Implement login API endpoint"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, WorkbackError};

/// One dated window of the workback schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    /// Free-form date label (e.g. `"Week 1"`, `"2025-03-01"`).
    pub date_label: String,

    /// Deliverables in issue-creation order. Duplicates are legal.
    pub deliverables: Vec<String>,
}

/// A release with its ordered workback schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePlan {
    pub name: String,
    pub description: String,
    pub windows: Vec<ScheduleWindow>,
}

#[derive(Debug, Deserialize)]
struct PlanDocument {
    release: ReleaseSection,
}

#[derive(Debug, Deserialize)]
struct ReleaseSection {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "schedule", alias = "workback")]
    workback_schedule: Vec<WindowSection>,
}

#[derive(Debug, Deserialize)]
struct WindowSection {
    #[serde(alias = "date_label", alias = "due")]
    date: String,
    #[serde(default)]
    deliverables: Vec<String>,
}

impl ReleasePlan {
    /// Load a plan, choosing the format from the file extension.
    ///
    /// `.json` is parsed as JSON, everything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let doc: PlanDocument = serde_yaml::from_str(raw)?;
        Self::from_document(doc)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let doc: PlanDocument = serde_json::from_str(raw)?;
        Self::from_document(doc)
    }

    fn from_document(doc: PlanDocument) -> Result<Self> {
        let release = doc.release;
        let name = release.name.trim().to_string();
        if name.is_empty() {
            return Err(WorkbackError::Plan("release name is empty".to_string()));
        }

        let mut windows = Vec::with_capacity(release.workback_schedule.len());
        for (idx, window) in release.workback_schedule.into_iter().enumerate() {
            let date_label = window.date.trim().to_string();
            if date_label.is_empty() {
                return Err(WorkbackError::Plan(format!(
                    "schedule window {} has an empty date label",
                    idx + 1
                )));
            }

            let before = window.deliverables.len();
            let deliverables: Vec<String> = window
                .deliverables
                .into_iter()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
            if deliverables.len() != before {
                warn!(
                    window = %date_label,
                    dropped = before - deliverables.len(),
                    "Dropping blank deliverables"
                );
            }

            windows.push(ScheduleWindow {
                date_label,
                deliverables,
            });
        }

        Ok(ReleasePlan {
            name,
            description: release.description.trim().to_string(),
            windows,
        })
    }

    /// Total number of deliverables across all windows.
    pub fn deliverable_count(&self) -> usize {
        self.windows.iter().map(|w| w.deliverables.len()).sum()
    }

    /// Iterate `(date_label, deliverable)` pairs in schedule order.
    pub fn deliverables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.windows.iter().flat_map(|w| {
            w.deliverables
                .iter()
                .map(move |d| (w.date_label.as_str(), d.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML_PLAN: &str = r#"
release:
  name: "v2.0"
  description: "Customer portal relaunch"
  workback_schedule:
    - date: "Week 1"
      deliverables:
        - "Implement login API endpoint"
        - "Setup CI pipeline"
    - date: "Week 2"
      deliverables:
        - "Design the database schema"
"#;

    #[test]
    fn test_parse_yaml_plan() {
        let plan = ReleasePlan::from_yaml_str(YAML_PLAN).expect("parse");
        assert_eq!(plan.name, "v2.0");
        assert_eq!(plan.description, "Customer portal relaunch");
        assert_eq!(plan.windows.len(), 2);
        assert_eq!(plan.windows[0].date_label, "Week 1");
        assert_eq!(plan.deliverable_count(), 3);
    }

    #[test]
    fn test_deliverables_preserve_schedule_order() {
        let plan = ReleasePlan::from_yaml_str(YAML_PLAN).expect("parse");
        let order: Vec<(&str, &str)> = plan.deliverables().collect();
        assert_eq!(
            order,
            vec![
                ("Week 1", "Implement login API endpoint"),
                ("Week 1", "Setup CI pipeline"),
                ("Week 2", "Design the database schema"),
            ]
        );
    }

    #[test]
    fn test_parse_json_plan() {
        let raw = r#"{"release": {"name": "r1", "workback_schedule": [
            {"date": "Day 1", "deliverables": ["Fix login bug", "Fix login bug"]}
        ]}}"#;
        let plan = ReleasePlan::from_json_str(raw).expect("parse");
        assert_eq!(plan.description, "");
        // Duplicates are independent deliverables.
        assert_eq!(plan.windows[0].deliverables.len(), 2);
    }

    #[test]
    fn test_blank_deliverables_dropped() {
        let raw = r#"
release:
  name: r1
  workback_schedule:
    - date: "Week 1"
      deliverables: ["  ", "Add search", ""]
"#;
        let plan = ReleasePlan::from_yaml_str(raw).expect("parse");
        assert_eq!(plan.windows[0].deliverables, vec!["Add search".to_string()]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let raw = "release:\n  name: \"  \"\n";
        let err = ReleasePlan::from_yaml_str(raw).unwrap_err();
        assert!(matches!(err, WorkbackError::Plan(_)));
    }

    #[test]
    fn test_empty_date_label_rejected() {
        let raw = r#"
release:
  name: r1
  workback_schedule:
    - date: ""
      deliverables: ["Add search"]
"#;
        let err = ReleasePlan::from_yaml_str(raw).unwrap_err();
        assert!(err.to_string().contains("window 1"));
    }

    #[test]
    fn test_empty_schedule_is_legal() {
        let plan = ReleasePlan::from_yaml_str("release:\n  name: r1\n").expect("parse");
        assert!(plan.windows.is_empty());
        assert_eq!(plan.deliverable_count(), 0);
    }

    #[test]
    fn test_from_path_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("release.json");
        std::fs::write(
            &json_path,
            r#"{"release": {"name": "json-plan", "workback_schedule": []}}"#,
        )
        .unwrap();
        let yaml_path = dir.path().join("release.yml");
        std::fs::write(&yaml_path, YAML_PLAN).unwrap();

        assert_eq!(ReleasePlan::from_path(&json_path).unwrap().name, "json-plan");
        assert_eq!(ReleasePlan::from_path(&yaml_path).unwrap().name, "v2.0");
    }
}
