//! Assignability analysis: can a deliverable go to an automated coding agent?
//!
//! Two phases:
//! 1. Context sufficiency. Topics (database, auth, api) are detected by
//!    substring; each detected topic checks the [`RepositoryContext`] and
//!    records satisfied context or missing details.
//! 2. Decision. Design intent always needs a human. Otherwise any missing
//!    detail means the deliverable needs clarification. Otherwise an
//!    implementation keyword plus context for every matched topic makes it
//!    automatable. Everything else falls through to a human.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::RepositoryContext;

pub const DATABASE_TOPIC_KEYWORDS: &[&str] = &["database", "schema"];
pub const AUTH_TOPIC_KEYWORDS: &[&str] = &["auth"];
pub const API_TOPIC_KEYWORDS: &[&str] = &["api"];

pub const DESIGN_KEYWORDS: &[&str] = &["design", "architect", "plan", "strategy", "analyze"];
pub const IMPLEMENTATION_KEYWORDS: &[&str] = &["implement", "create", "add", "build", "setup"];

pub const CONFIDENCE_AUTOMATABLE: u8 = 85;
pub const CONFIDENCE_HUMAN_REQUIRED: u8 = 90;
pub const CONFIDENCE_NEEDS_CLARIFICATION: u8 = 30;

const RATIONALE_DESIGN: &str =
    "Deliverable expresses design intent and needs human judgement before implementation";
const RATIONALE_AUTOMATABLE: &str =
    "Implementation work with sufficient repository context for an automated coding agent";
const RATIONALE_HUMAN: &str =
    "No clear implementation scope for the available repository context; assign to a human";

/// Assignment recommendation for one deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentDecision {
    Automatable,
    HumanRequired,
    NeedsClarification,
}

impl AssignmentDecision {
    /// The two tracker labels that mark this decision.
    pub fn labels(&self) -> [&'static str; 2] {
        match self {
            AssignmentDecision::Automatable => ["copilot-ready", "auto-implementable"],
            AssignmentDecision::HumanRequired => ["human-required", "needs-design"],
            AssignmentDecision::NeedsClarification => {
                ["needs-clarification", "missing-requirements"]
            }
        }
    }

    /// Whether the item should be assigned to the default human owner.
    pub fn needs_owner(&self) -> bool {
        !matches!(self, AssignmentDecision::Automatable)
    }
}

impl fmt::Display for AssignmentDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssignmentDecision::Automatable => "Automatable",
            AssignmentDecision::HumanRequired => "Human required",
            AssignmentDecision::NeedsClarification => "Needs clarification",
        };
        f.write_str(name)
    }
}

/// Result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignabilityResult {
    pub decision: AssignmentDecision,
    /// 0-100.
    pub confidence: u8,
    pub rationale: String,
    pub satisfied_context: Vec<String>,
    pub missing_details: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Topics {
    database: bool,
    auth: bool,
    api: bool,
}

impl Topics {
    fn detect(lowered: &str) -> Self {
        Topics {
            database: mentions_any(lowered, DATABASE_TOPIC_KEYWORDS),
            auth: mentions_any(lowered, AUTH_TOPIC_KEYWORDS),
            api: mentions_any(lowered, API_TOPIC_KEYWORDS),
        }
    }

    /// Every matched topic has its context tag.
    fn covered_by(&self, ctx: &RepositoryContext) -> bool {
        (!self.database || ctx.has_database())
            && (!self.auth || ctx.has_auth())
            && (!self.api || ctx.has_web_framework())
    }
}

fn mentions_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| lowered.contains(kw))
}

/// Decide how a deliverable should be assigned given the repository context.
pub fn analyze(text: &str, ctx: &RepositoryContext) -> AssignabilityResult {
    let lowered = text.to_lowercase();
    let topics = Topics::detect(&lowered);

    let mut satisfied = Vec::new();
    let mut missing = Vec::new();

    if topics.database {
        if ctx.has_models() {
            satisfied.push("existing_models_present".to_string());
        }
        if ctx.has_orm() {
            satisfied.push("orm_configured".to_string());
        }
        if !ctx.has_database() {
            missing.push("database_provider_selection".to_string());
        }
        if !ctx.has_models() {
            missing.push("initial_data_model_design".to_string());
        }
        if lowered.contains("migration") && !ctx.has_orm() {
            missing.push("migration_strategy".to_string());
        }
    }

    if topics.auth {
        if ctx.has_auth() {
            satisfied.push("authentication_configured".to_string());
        } else {
            missing.extend(
                [
                    "authentication_provider_choice",
                    "user_role_definitions",
                    "session_management_strategy",
                ]
                .map(String::from),
            );
        }
    }

    if topics.api {
        if ctx.has_web_framework() {
            satisfied.push("web_framework_present".to_string());
        } else {
            missing.push("api_framework_setup".to_string());
        }
        // Endpoint work always needs its contract spelled out.
        if lowered.contains("endpoint") {
            missing.extend(
                [
                    "api_endpoint_specifications",
                    "request_response_schemas",
                    "error_handling_patterns",
                ]
                .map(String::from),
            );
        }
    }

    let (decision, confidence, rationale) = if mentions_any(&lowered, DESIGN_KEYWORDS) {
        (
            AssignmentDecision::HumanRequired,
            CONFIDENCE_HUMAN_REQUIRED,
            RATIONALE_DESIGN.to_string(),
        )
    } else if !missing.is_empty() {
        (
            AssignmentDecision::NeedsClarification,
            CONFIDENCE_NEEDS_CLARIFICATION,
            format!(
                "{} required context detail(s) missing before this can be assigned",
                missing.len()
            ),
        )
    } else if mentions_any(&lowered, IMPLEMENTATION_KEYWORDS) && topics.covered_by(ctx) {
        (
            AssignmentDecision::Automatable,
            CONFIDENCE_AUTOMATABLE,
            RATIONALE_AUTOMATABLE.to_string(),
        )
    } else {
        (
            AssignmentDecision::HumanRequired,
            CONFIDENCE_HUMAN_REQUIRED,
            RATIONALE_HUMAN.to_string(),
        )
    };

    AssignabilityResult {
        decision,
        confidence,
        rationale,
        satisfied_context: satisfied,
        missing_details: missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_context() -> RepositoryContext {
        RepositoryContext::new()
            .with_framework("next")
            .with_database("prisma")
            .with_database("postgresql")
            .with_auth("next-auth")
            .with_model("User")
    }

    #[test]
    fn test_design_deliverable_is_never_automatable() {
        for ctx in [RepositoryContext::new(), full_context()] {
            let result = analyze("Design the database schema", &ctx);
            assert_eq!(result.decision, AssignmentDecision::HumanRequired);
            assert_eq!(result.confidence, CONFIDENCE_HUMAN_REQUIRED);
        }
    }

    #[test]
    fn test_design_deliverable_still_reports_missing_context() {
        let result = analyze("Design the database schema", &RepositoryContext::new());
        assert_eq!(
            result.missing_details,
            vec!["database_provider_selection", "initial_data_model_design"]
        );
    }

    #[test]
    fn test_auth_without_auth_tags_needs_clarification() {
        let ctx = RepositoryContext::new().with_framework("next");
        let result = analyze("Implement user authentication API", &ctx);
        assert_eq!(result.decision, AssignmentDecision::NeedsClarification);
        assert_eq!(result.confidence, CONFIDENCE_NEEDS_CLARIFICATION);
        for detail in [
            "authentication_provider_choice",
            "user_role_definitions",
            "session_management_strategy",
        ] {
            assert!(result.missing_details.contains(&detail.to_string()));
        }
        assert!(result.rationale.starts_with("3 "));
    }

    #[test]
    fn test_migration_strategy_depends_on_orm() {
        let with_orm = full_context();
        let result = analyze("Add database migration script", &with_orm);
        assert!(!result.missing_details.contains(&"migration_strategy".to_string()));
        assert!(result.satisfied_context.contains(&"orm_configured".to_string()));

        let without_orm = RepositoryContext::new()
            .with_database("postgresql")
            .with_model("User");
        let result = analyze("Add database migration script", &without_orm);
        assert_eq!(result.missing_details, vec!["migration_strategy"]);
        assert_eq!(result.decision, AssignmentDecision::NeedsClarification);
    }

    #[test]
    fn test_endpoint_details_are_unconditional() {
        let ctx = RepositoryContext::new()
            .with_auth("next-auth")
            .with_framework("express");
        let result = analyze("Implement login API endpoint", &ctx);
        assert_eq!(
            result.missing_details,
            vec![
                "api_endpoint_specifications",
                "request_response_schemas",
                "error_handling_patterns",
            ]
        );
        assert_eq!(result.decision, AssignmentDecision::NeedsClarification);
        assert!(result
            .satisfied_context
            .contains(&"web_framework_present".to_string()));
    }

    #[test]
    fn test_api_without_framework_needs_setup() {
        let result = analyze("Build reporting API", &RepositoryContext::new());
        assert_eq!(result.missing_details, vec!["api_framework_setup"]);
    }

    #[test]
    fn test_implementation_with_context_is_automatable() {
        let result = analyze("Build reporting API", &full_context());
        assert_eq!(result.decision, AssignmentDecision::Automatable);
        assert_eq!(result.confidence, CONFIDENCE_AUTOMATABLE);
        assert!(result.missing_details.is_empty());
    }

    #[test]
    fn test_implementation_without_topics_is_automatable() {
        let result = analyze("Create settings page", &RepositoryContext::new());
        assert_eq!(result.decision, AssignmentDecision::Automatable);
    }

    #[test]
    fn test_no_keywords_defaults_to_human() {
        let result = analyze("Quarterly stakeholder review", &full_context());
        assert_eq!(result.decision, AssignmentDecision::HumanRequired);
        assert_eq!(result.confidence, CONFIDENCE_HUMAN_REQUIRED);
        assert!(result.missing_details.is_empty());
        assert!(result.satisfied_context.is_empty());
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(
            AssignmentDecision::Automatable.labels(),
            ["copilot-ready", "auto-implementable"]
        );
        assert!(!AssignmentDecision::Automatable.needs_owner());
        assert!(AssignmentDecision::HumanRequired.needs_owner());
        assert!(AssignmentDecision::NeedsClarification.needs_owner());
    }
}
