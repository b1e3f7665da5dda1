//! Repository context probing for a local checkout.
//!
//! Reads a fixed set of manifests, schema files and marker files and extracts
//! coarse tags. Missing files contribute nothing; unparseable manifests are
//! logged and skipped.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::RepositoryContext;
use crate::error::{Result, WorkbackError};

/// `(dependency, tag)` pairs for npm web frameworks.
const NPM_FRAMEWORKS: &[(&str, &str)] = &[
    ("next", "next"),
    ("express", "express"),
    ("fastify", "fastify"),
    ("koa", "koa"),
    ("@nestjs/core", "nestjs"),
    ("react", "react"),
    ("vue", "vue"),
    ("svelte", "svelte"),
];

const NPM_DATABASES: &[(&str, &str)] = &[
    ("prisma", "prisma"),
    ("@prisma/client", "prisma"),
    ("typeorm", "typeorm"),
    ("sequelize", "sequelize"),
    ("drizzle-orm", "drizzle"),
    ("mongoose", "mongoose"),
    ("pg", "postgresql"),
    ("mysql2", "mysql"),
    ("sqlite3", "sqlite"),
    ("mongodb", "mongodb"),
];

const NPM_AUTH: &[(&str, &str)] = &[
    ("next-auth", "next-auth"),
    ("@auth/core", "authjs"),
    ("passport", "passport"),
    ("@clerk/nextjs", "clerk"),
    ("jsonwebtoken", "jwt"),
    ("lucia", "lucia"),
];

const CARGO_FRAMEWORKS: &[(&str, &str)] = &[
    ("axum", "axum"),
    ("actix-web", "actix-web"),
    ("rocket", "rocket"),
    ("warp", "warp"),
];

const CARGO_DATABASES: &[(&str, &str)] = &[
    ("diesel", "diesel"),
    ("sqlx", "sqlx"),
    ("sea-orm", "sea-orm"),
];

const CARGO_AUTH: &[(&str, &str)] = &[("jsonwebtoken", "jwt"), ("oauth2", "oauth2")];

const PYTHON_FRAMEWORKS: &[(&str, &str)] = &[
    ("django", "django"),
    ("flask", "flask"),
    ("fastapi", "fastapi"),
];

const PYTHON_DATABASES: &[(&str, &str)] = &[
    ("sqlalchemy", "sqlalchemy"),
    ("psycopg", "postgresql"),
    ("psycopg2", "postgresql"),
    ("psycopg2-binary", "postgresql"),
];

const PYTHON_AUTH: &[(&str, &str)] = &[("authlib", "authlib"), ("pyjwt", "jwt")];

/// Single-file CI configurations. GitHub Actions is detected from
/// `.github/workflows/*.yml`.
const CI_MARKERS: &[(&str, &str)] = &[
    (".circleci/config.yml", "circle-ci"),
    (".travis.yml", "travis-ci"),
    (".gitlab-ci.yml", "gitlab-ci"),
];

/// Files or directories that identify a deployment method.
const DEPLOY_MARKERS: &[(&str, &str)] = &[
    ("vercel.json", "vercel"),
    (".vercel", "vercel"),
    ("Dockerfile", "docker"),
    ("docker-compose.yml", "docker"),
    ("docker-compose.yaml", "docker"),
    (".clasp.json", "clasp"),
    ("appsscript.json", "clasp"),
];

/// Directories never searched for SQL files.
const SQL_IGNORED_DIRS: &[&str] = &["node_modules", "dist", "build", "target", ".git"];

/// Probe a local checkout and build its [`RepositoryContext`].
pub fn probe_repository(root: &Path) -> Result<RepositoryContext> {
    if !root.is_dir() {
        return Err(WorkbackError::Context(format!(
            "repository path is not a directory: {}",
            root.display()
        )));
    }

    let mut ctx = RepositoryContext::new();

    if let Some(raw) = read_optional(&root.join("package.json"))? {
        probe_package_json(&raw, &mut ctx);
    }
    if let Some(raw) = read_optional(&root.join("Cargo.toml"))? {
        probe_cargo_toml(&raw, &mut ctx);
    }
    if let Some(raw) = read_optional(&root.join("requirements.txt"))? {
        ctx.tech_stack.insert("python".to_string());
        let names: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#') && !line.starts_with('-'))
            .filter_map(requirement_name)
            .collect();
        tag_python(&names, &mut ctx);
    }
    if let Some(raw) = read_optional(&root.join("pyproject.toml"))? {
        probe_pyproject(&raw, &mut ctx);
    }
    if let Some(raw) = read_optional(&root.join("prisma").join("schema.prisma"))? {
        probe_prisma_schema(&raw, &mut ctx);
    }
    if root.join("migrations").is_dir() || root.join("prisma").join("migrations").is_dir() {
        ctx.tech_stack.insert("migrations".to_string());
    }

    probe_ci(root, &mut ctx);
    for (marker, tag) in DEPLOY_MARKERS {
        if root.join(marker).exists() {
            ctx.tech_stack.insert((*tag).to_string());
        }
    }
    probe_sql_files(root, &mut ctx)?;

    debug!(
        tech_stack = ctx.tech_stack.len(),
        frameworks = ctx.frameworks.len(),
        databases = ctx.databases.len(),
        auth_methods = ctx.auth_methods.len(),
        models = ctx.existing_models.len(),
        "Probed repository context"
    );
    Ok(ctx)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(WorkbackError::Io(e)),
    }
}

fn probe_package_json(raw: &str, ctx: &mut RepositoryContext) {
    let manifest: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Ignoring unparseable package.json");
            return;
        }
    };

    ctx.tech_stack.insert("node".to_string());

    let mut deps: Vec<&str> = Vec::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(map) = manifest.get(section).and_then(Value::as_object) {
            deps.extend(map.keys().map(String::as_str));
        }
    }

    if deps.contains(&"typescript") {
        ctx.tech_stack.insert("typescript".to_string());
    }
    tag_exact(&deps, NPM_FRAMEWORKS, &mut ctx.frameworks);
    tag_exact(&deps, NPM_DATABASES, &mut ctx.databases);
    tag_exact(&deps, NPM_AUTH, &mut ctx.auth_methods);
}

fn parse_toml(raw: &str, file: &str) -> Option<toml::Value> {
    match raw.parse::<toml::Value>() {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(file = file, error = %e, "Ignoring unparseable manifest");
            None
        }
    }
}

fn table_keys<'a>(value: Option<&'a toml::Value>, into: &mut Vec<&'a str>) {
    if let Some(table) = value.and_then(toml::Value::as_table) {
        into.extend(table.keys().map(String::as_str));
    }
}

/// Dependency names from `[dependencies]`, `[dev-dependencies]`,
/// `[workspace.dependencies]` and `[target.*.dependencies]`.
fn probe_cargo_toml(raw: &str, ctx: &mut RepositoryContext) {
    let Some(doc) = parse_toml(raw, "Cargo.toml") else {
        return;
    };
    ctx.tech_stack.insert("rust".to_string());

    let mut deps: Vec<&str> = Vec::new();
    for section in ["dependencies", "dev-dependencies"] {
        table_keys(doc.get(section), &mut deps);
    }
    table_keys(
        doc.get("workspace").and_then(|w| w.get("dependencies")),
        &mut deps,
    );
    if let Some(targets) = doc.get("target").and_then(toml::Value::as_table) {
        for target in targets.values() {
            for section in ["dependencies", "dev-dependencies"] {
                table_keys(target.get(section), &mut deps);
            }
        }
    }

    tag_exact(&deps, CARGO_FRAMEWORKS, &mut ctx.frameworks);
    tag_exact(&deps, CARGO_DATABASES, &mut ctx.databases);
    tag_exact(&deps, CARGO_AUTH, &mut ctx.auth_methods);
}

/// PEP 621 `project.dependencies` (plus optional groups) and Poetry
/// `tool.poetry.dependencies` (plus dev and group tables).
fn probe_pyproject(raw: &str, ctx: &mut RepositoryContext) {
    let Some(doc) = parse_toml(raw, "pyproject.toml") else {
        return;
    };
    ctx.tech_stack.insert("python".to_string());

    let mut names: Vec<String> = Vec::new();
    if let Some(project) = doc.get("project") {
        let mut requirements: Vec<&toml::Value> = Vec::new();
        if let Some(deps) = project.get("dependencies").and_then(toml::Value::as_array) {
            requirements.extend(deps);
        }
        if let Some(groups) = project
            .get("optional-dependencies")
            .and_then(toml::Value::as_table)
        {
            for group in groups.values().filter_map(toml::Value::as_array) {
                requirements.extend(group);
            }
        }
        names.extend(
            requirements
                .into_iter()
                .filter_map(toml::Value::as_str)
                .filter_map(requirement_name),
        );
    }

    if let Some(poetry) = doc.get("tool").and_then(|t| t.get("poetry")) {
        let mut keys: Vec<&str> = Vec::new();
        for section in ["dependencies", "dev-dependencies"] {
            table_keys(poetry.get(section), &mut keys);
        }
        if let Some(groups) = poetry.get("group").and_then(toml::Value::as_table) {
            for group in groups.values() {
                table_keys(group.get("dependencies"), &mut keys);
            }
        }
        names.extend(keys.into_iter().map(str::to_lowercase));
    }

    tag_python(&names, ctx);
}

/// Distribution name of a PEP 508 requirement, lowercased:
/// `"FastAPI[all]>=0.110"` is `fastapi`.
fn requirement_name(requirement: &str) -> Option<String> {
    let name: String = requirement
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    (!name.is_empty()).then(|| name.to_lowercase())
}

fn tag_python(names: &[String], ctx: &mut RepositoryContext) {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    tag_exact(&names, PYTHON_FRAMEWORKS, &mut ctx.frameworks);
    tag_exact(&names, PYTHON_DATABASES, &mut ctx.databases);
    tag_exact(&names, PYTHON_AUTH, &mut ctx.auth_methods);
}

fn tag_exact(deps: &[&str], table: &[(&str, &str)], into: &mut BTreeSet<String>) {
    for (dep, tag) in table {
        if deps.contains(dep) {
            into.insert((*tag).to_string());
        }
    }
}

fn probe_ci(root: &Path, ctx: &mut RepositoryContext) {
    let has_workflows = std::fs::read_dir(root.join(".github").join("workflows"))
        .map(|entries| {
            entries.flatten().any(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.ends_with(".yml") || name.ends_with(".yaml")
            })
        })
        .unwrap_or(false);
    if has_workflows {
        ctx.tech_stack.insert("github-actions".to_string());
    }
    for (marker, tag) in CI_MARKERS {
        if root.join(marker).is_file() {
            ctx.tech_stack.insert((*tag).to_string());
        }
    }
}

/// Raw SQL files anywhere in the checkout. Any hit adds the `sql` database
/// tag; files under a migration or schema path also add `migrations`.
fn probe_sql_files(root: &Path, ctx: &mut RepositoryContext) -> Result<()> {
    let pattern = format!(
        "{}/**/*.sql",
        glob::Pattern::escape(&root.display().to_string())
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| WorkbackError::Context(format!("invalid SQL search pattern: {}", e)))?;

    let mut found = 0usize;
    let mut migrations = 0usize;
    for path in entries.flatten() {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let ignored = relative.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            SQL_IGNORED_DIRS.iter().any(|dir| name == *dir)
        });
        if ignored || !path.is_file() {
            continue;
        }
        found += 1;
        let relative = relative.to_string_lossy().to_lowercase();
        if ["migration", "migrate", "schema"]
            .iter()
            .any(|hint| relative.contains(hint))
        {
            migrations += 1;
        }
    }

    if found > 0 {
        debug!(files = found, migrations = migrations, "Found SQL files");
        ctx.databases.insert("sql".to_string());
    }
    if migrations > 0 {
        ctx.tech_stack.insert("migrations".to_string());
    }
    Ok(())
}

fn probe_prisma_schema(raw: &str, ctx: &mut RepositoryContext) {
    ctx.databases.insert("prisma".to_string());

    if let Ok(provider) = Regex::new(r#"(?s)datasource\s+\w+\s*\{[^}]*provider\s*=\s*"(\w+)""#) {
        if let Some(caps) = provider.captures(raw) {
            ctx.databases.insert(caps[1].to_lowercase());
        }
    }
    if let Ok(model) = Regex::new(r"(?m)^\s*model\s+(\w+)\s*\{") {
        for caps in model.captures_iter(raw) {
            let name = caps[1].to_string();
            if !ctx.existing_models.contains(&name) {
                ctx.existing_models.push(name);
            }
        }
    }
}
