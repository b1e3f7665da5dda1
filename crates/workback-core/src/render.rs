//! Tracker item rendering: title, body, labels and assignees for a deliverable.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::analyzer::AssignabilityResult;
use crate::classifier::{Classification, KEYWORD_TABLE_VERSION};
use crate::plan::ReleasePlan;
use crate::tracker::TrackerItem;

/// Marks every item created by Workback.
pub const PROVENANCE_LABEL: &str = "workback";

/// Prefix of the HTML comment that carries the deliverable fingerprint.
pub const FINGERPRINT_MARKER: &str = "workback-fingerprint:";

/// GitHub rejects labels longer than 50 characters.
const MAX_LABEL_LEN: usize = 50;

/// Stable identity of a deliverable within a release.
///
/// SHA-256 over the release name, date label and deliverable text,
/// NUL-separated, hex encoded.
pub fn fingerprint(release: &str, date_label: &str, deliverable: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(release.as_bytes());
    hasher.update(b"\0");
    hasher.update(date_label.as_bytes());
    hasher.update(b"\0");
    hasher.update(deliverable.as_bytes());
    hex::encode(hasher.finalize())
}

/// Release label, e.g. `release:v2-0-portal`.
pub fn release_label(release: &str) -> String {
    let mut slug = String::with_capacity(release.len());
    let mut last_dash = true;
    for c in release.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    let label = format!("release:{}", if slug.is_empty() { "unnamed" } else { slug });
    label.chars().take(MAX_LABEL_LEN).collect()
}

/// Inputs for one tracked item.
pub struct ItemInput<'a> {
    pub plan: &'a ReleasePlan,
    pub date_label: &'a str,
    pub deliverable: &'a str,
    pub classification: &'a Classification,
    pub assessment: &'a AssignabilityResult,
    pub default_assignee: &'a str,
}

/// Build the tracker item for a triaged deliverable.
pub fn build_item(input: &ItemInput<'_>) -> TrackerItem {
    let fingerprint = fingerprint(&input.plan.name, input.date_label, input.deliverable);

    let mut labels = BTreeSet::new();
    labels.insert(PROVENANCE_LABEL.to_string());
    labels.insert(release_label(&input.plan.name));
    labels.insert(input.classification.work_type.label().to_string());
    for label in input.assessment.decision.labels() {
        labels.insert(label.to_string());
    }

    let mut assignees = BTreeSet::new();
    if input.assessment.decision.needs_owner() && !input.default_assignee.is_empty() {
        assignees.insert(input.default_assignee.to_string());
    }

    TrackerItem {
        title: format!("[{}] {}", input.date_label, input.deliverable),
        body: render_body(input, &fingerprint),
        labels,
        assignees,
        fingerprint: Some(fingerprint),
        ..Default::default()
    }
}

fn render_body(input: &ItemInput<'_>, fingerprint: &str) -> String {
    let assessment = input.assessment;
    let mut body = format!("## Deliverable\n\n{}\n\n", input.deliverable);
    body.push_str(&format!("- **Release:** {}\n", input.plan.name));
    body.push_str(&format!("- **Due:** {}\n", input.date_label));
    body.push_str(&format!(
        "- **Work type:** {} (keyword table v{})\n",
        input.classification.work_type, KEYWORD_TABLE_VERSION
    ));

    if !input.plan.description.is_empty() {
        body.push_str(&format!(
            "\n### Release description\n\n{}\n",
            input.plan.description
        ));
    }

    body.push_str("\n### Assignability\n\n");
    body.push_str(&format!(
        "- **Recommendation:** {} (confidence {}%)\n",
        assessment.decision, assessment.confidence
    ));
    body.push_str(&format!("- **Rationale:** {}\n", assessment.rationale));

    if !assessment.satisfied_context.is_empty() {
        body.push_str("\n**Context available**\n\n");
        for entry in &assessment.satisfied_context {
            body.push_str(&format!("- {}\n", entry));
        }
    }
    if !assessment.missing_details.is_empty() {
        body.push_str("\n**Missing details**\n\n");
        for entry in &assessment.missing_details {
            body.push_str(&format!("- [ ] {}\n", entry));
        }
    }

    body.push_str(&format!("\n<!-- {}{} -->\n", FINGERPRINT_MARKER, fingerprint));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::classifier::classify;
    use crate::context::RepositoryContext;
    use crate::plan::ScheduleWindow;

    fn plan() -> ReleasePlan {
        ReleasePlan {
            name: "v2.0 Portal".to_string(),
            description: "Customer portal relaunch".to_string(),
            windows: vec![ScheduleWindow {
                date_label: "Week 1".to_string(),
                deliverables: vec!["Implement login API endpoint".to_string()],
            }],
        }
    }

    fn build(deliverable: &str, ctx: &RepositoryContext) -> TrackerItem {
        let plan = plan();
        let classification = classify(deliverable);
        let assessment = analyze(deliverable, ctx);
        build_item(&ItemInput {
            plan: &plan,
            date_label: "Week 1",
            deliverable,
            classification: &classification,
            assessment: &assessment,
            default_assignee: "octo-lead",
        })
    }

    #[test]
    fn test_fingerprint_is_stable_and_field_sensitive() {
        let a = fingerprint("v1", "Week 1", "Add search");
        assert_eq!(a, fingerprint("v1", "Week 1", "Add search"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, fingerprint("v1", "Week 2", "Add search"));
        // Separator keeps field boundaries distinct.
        assert_ne!(fingerprint("ab", "c", "d"), fingerprint("a", "bc", "d"));
    }

    #[test]
    fn test_release_label_slug() {
        assert_eq!(release_label("v2.0 Portal"), "release:v2-0-portal");
        assert_eq!(release_label("  Q3 -- launch!! "), "release:q3-launch");
        assert_eq!(release_label("***"), "release:unnamed");
        assert!(release_label(&"x".repeat(200)).len() <= MAX_LABEL_LEN);
    }

    #[test]
    fn test_needs_clarification_item() {
        let item = build("Implement login API endpoint", &RepositoryContext::new());

        assert_eq!(item.title, "[Week 1] Implement login API endpoint");
        for label in [
            "workback",
            "release:v2-0-portal",
            "type:feature",
            "needs-clarification",
            "missing-requirements",
        ] {
            assert!(item.labels.contains(label), "missing label {label}");
        }
        assert!(item.assignees.contains("octo-lead"));
        assert!(item.body.contains("- [ ] api_endpoint_specifications"));
        assert!(item.body.contains("Customer portal relaunch"));
        assert!(item
            .body
            .contains(&format!("keyword table v{}", KEYWORD_TABLE_VERSION)));
        assert!(item.body.contains(FINGERPRINT_MARKER));
        assert!(item
            .body
            .contains(item.fingerprint.as_deref().unwrap_or_default()));
    }

    #[test]
    fn test_automatable_item_has_no_assignee() {
        let item = build("Create settings page", &RepositoryContext::new());
        assert!(item.labels.contains("copilot-ready"));
        assert!(item.labels.contains("auto-implementable"));
        assert!(item.assignees.is_empty());
        assert!(item.body.contains("Automatable (confidence 85%)"));
    }

    #[test]
    fn test_human_required_item() {
        let item = build("Quarterly stakeholder review", &RepositoryContext::new());
        assert!(item.labels.contains("human-required"));
        assert!(item.labels.contains("needs-design"));
        assert!(item.labels.contains("type:task"));
        assert_eq!(item.assignees.len(), 1);
        assert_eq!(item.labels.len(), 5);
    }
}
