//! Repository technology snapshot consumed by the assignability analyzer.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Database tags that name an ORM or query layer rather than a database engine.
pub const ORM_TAGS: &[&str] = &[
    "orm",
    "prisma",
    "typeorm",
    "sequelize",
    "drizzle",
    "mongoose",
    "sqlalchemy",
    "diesel",
    "sqlx",
    "sea-orm",
];

/// Read-only snapshot of detected technology tags for the target repository.
///
/// Built once per run and shared by every deliverable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryContext {
    pub tech_stack: BTreeSet<String>,
    /// Web frameworks only.
    pub frameworks: BTreeSet<String>,
    /// Database engines and ORMs.
    pub databases: BTreeSet<String>,
    pub auth_methods: BTreeSet<String>,
    /// Data model names in first-seen order.
    pub existing_models: Vec<String>,
}

impl RepositoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a context snapshot previously written as JSON.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn has_database(&self) -> bool {
        !self.databases.is_empty()
    }

    pub fn has_orm(&self) -> bool {
        self.databases
            .iter()
            .any(|tag| ORM_TAGS.contains(&tag.to_lowercase().as_str()))
    }

    pub fn has_auth(&self) -> bool {
        !self.auth_methods.is_empty()
    }

    pub fn has_web_framework(&self) -> bool {
        !self.frameworks.is_empty()
    }

    pub fn has_models(&self) -> bool {
        !self.existing_models.is_empty()
    }

    pub fn with_tech(mut self, tag: &str) -> Self {
        self.tech_stack.insert(tag.to_string());
        self
    }

    pub fn with_framework(mut self, tag: &str) -> Self {
        self.frameworks.insert(tag.to_string());
        self
    }

    pub fn with_database(mut self, tag: &str) -> Self {
        self.databases.insert(tag.to_string());
        self
    }

    pub fn with_auth(mut self, tag: &str) -> Self {
        self.auth_methods.insert(tag.to_string());
        self
    }

    pub fn with_model(mut self, name: &str) -> Self {
        if !self.existing_models.iter().any(|m| m == name) {
            self.existing_models.push(name.to_string());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_has_nothing() {
        let ctx = RepositoryContext::new();
        assert!(!ctx.has_database());
        assert!(!ctx.has_orm());
        assert!(!ctx.has_auth());
        assert!(!ctx.has_web_framework());
        assert!(!ctx.has_models());
    }

    #[test]
    fn test_database_engine_is_not_an_orm() {
        let ctx = RepositoryContext::new().with_database("postgresql");
        assert!(ctx.has_database());
        assert!(!ctx.has_orm());

        let ctx = ctx.with_database("Prisma");
        assert!(ctx.has_orm());
    }

    #[test]
    fn test_with_model_keeps_first_seen_order_without_duplicates() {
        let ctx = RepositoryContext::new()
            .with_model("User")
            .with_model("Order")
            .with_model("User");
        assert_eq!(ctx.existing_models, vec!["User", "Order"]);
    }

    #[test]
    fn test_json_snapshot_round_trip_with_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        std::fs::write(&path, r#"{"frameworks": ["next"], "auth_methods": ["next-auth"]}"#)
            .unwrap();

        let ctx = RepositoryContext::from_json_path(&path).expect("load");
        assert!(ctx.has_web_framework());
        assert!(ctx.has_auth());
        assert!(ctx.databases.is_empty());
    }
}
