//! Workback CLI
//!
//! The `workback` command turns a release workback schedule into triaged
//! GitHub issues.
//!
//! ## Commands
//!
//! - `sync`: create issues for every deliverable and attach them to a project
//! - `triage`: classify and analyze deliverables without touching GitHub
//! - `context`: probe a repository checkout and print its technology context

use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use workback_core::obs::RunSpan;
use workback_core::{
    probe_repository, AssignmentDecision, PreparedDeliverable, ReleasePlan, RepositoryContext,
    RetryConfig, RetryingGateway, RunDriver, RunOptions, SyncConfig, WorkType,
};
use workback_github::{GitHubConfig, GitHubGateway};

#[derive(Parser)]
#[command(name = "workback")]
#[command(author = "Workback Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Release workback schedule to GitHub issue synchronization", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct ContextArgs {
    /// Local checkout to probe for technology context
    #[arg(long, conflicts_with = "context")]
    repo_path: Option<PathBuf>,

    /// Previously captured context snapshot (JSON)
    #[arg(long)]
    context: Option<PathBuf>,
}

/// Tracker settings; each falls back to its environment variable.
#[derive(clap::Args, Debug)]
struct TrackerArgs {
    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Target repository as owner/name
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Project owner (default: repository owner)
    #[arg(long, env = "WORKBACK_PROJECT_OWNER")]
    project_owner: Option<String>,

    /// Project number to attach issues to
    #[arg(long, env = "WORKBACK_PROJECT_NUMBER")]
    project_number: Option<u64>,

    /// Assignee for issues that need a human (default: repository owner)
    #[arg(long, env = "WORKBACK_DEFAULT_ASSIGNEE")]
    default_assignee: Option<String>,

    /// Skip deliverables that already have an issue
    #[arg(
        long,
        env = "WORKBACK_SKIP_EXISTING",
        value_parser = BoolishValueParser::new()
    )]
    skip_existing: bool,

    /// GitHub API base URL (GitHub Enterprise: https://host/api/v3)
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,
}

impl TrackerArgs {
    fn into_config(self) -> SyncConfig {
        let mut config = SyncConfig::default().with_skip_existing(self.skip_existing);
        if let Some(token) = self.token {
            config = config.with_token(&token);
        }
        if let Some(repository) = self.repository {
            config = config.with_repository(&repository);
        }
        if let Some(number) = self.project_number {
            config = config.with_project(self.project_owner.as_deref(), number);
        } else {
            config.project_owner = self.project_owner;
        }
        if let Some(assignee) = self.default_assignee {
            config = config.with_default_assignee(&assignee);
        }
        if let Some(api_url) = self.api_url {
            config = config.with_api_url(&api_url);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create issues for every deliverable in a release plan
    Sync {
        /// Release plan (YAML or JSON)
        #[arg(short, long)]
        plan: PathBuf,

        #[command(flatten)]
        context: ContextArgs,

        #[command(flatten)]
        tracker: TrackerArgs,

        /// Attempts per GitHub call, including the first
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Triage only; do not call GitHub
        #[arg(long)]
        dry_run: bool,

        /// Summary output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Classify and analyze deliverables without calling GitHub
    Triage {
        /// Release plan (YAML or JSON)
        #[arg(short, long)]
        plan: PathBuf,

        #[command(flatten)]
        context: ContextArgs,

        /// Assignee shown for issues that need a human
        #[arg(long, default_value = "")]
        default_assignee: String,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Probe a repository checkout and print its context as JSON
    Context {
        /// Checkout to probe
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    workback_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Sync {
            plan,
            context,
            tracker,
            max_attempts,
            dry_run,
            format,
        } => {
            let config = tracker.into_config();

            if dry_run {
                let assignee = dry_run_assignee(&config);
                return cmd_triage(&plan, &context, &assignee, format);
            }
            cmd_sync(config, &plan, &context, max_attempts, format).await
        }
        Commands::Triage {
            plan,
            context,
            default_assignee,
            format,
        } => cmd_triage(&plan, &context, &default_assignee, format),
        Commands::Context { path } => cmd_context(&path),
    }
}

async fn cmd_sync(
    config: SyncConfig,
    plan_path: &Path,
    context_args: &ContextArgs,
    max_attempts: u32,
    format: OutputFormat,
) -> Result<()> {
    let config = config.validate().context("Invalid sync configuration")?;
    let plan = load_plan(plan_path)?;
    let context = load_context(context_args)?;

    info!(
        repository = %config.repository,
        project = ?config.project.as_ref().map(|p| p.to_string()),
        deliverables = plan.deliverable_count(),
        "Starting sync"
    );

    let github = GitHubGateway::new(GitHubConfig::from(&config))
        .context("Failed to create GitHub client")?;
    let gateway = RetryingGateway::new(
        github,
        RetryConfig::default().with_max_attempts(max_attempts),
    );
    let driver = RunDriver::new(
        Arc::new(gateway),
        RunOptions {
            default_assignee: config.default_assignee.clone(),
            skip_existing: config.skip_existing,
        },
    );

    let summary = driver.run(&plan, &context, config.project.as_ref()).await;

    match format {
        OutputFormat::Text => print!("{}", summary.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if summary.project_unavailable() {
        if let Some(project) = &config.project {
            bail!(
                "Project {} could not be resolved; issues were created without project integration",
                project
            );
        }
    }
    Ok(())
}

/// One triaged deliverable as printed by `triage` and `sync --dry-run`.
#[derive(Debug, Serialize)]
struct TriageRow {
    date_label: String,
    deliverable: String,
    title: String,
    work_type: WorkType,
    decision: AssignmentDecision,
    confidence: u8,
    rationale: String,
    labels: Vec<String>,
    assignees: Vec<String>,
    missing_details: Vec<String>,
}

impl From<PreparedDeliverable> for TriageRow {
    fn from(p: PreparedDeliverable) -> Self {
        TriageRow {
            date_label: p.date_label,
            deliverable: p.text,
            title: p.item.title,
            work_type: p.classification.work_type,
            decision: p.assessment.decision,
            confidence: p.assessment.confidence,
            rationale: p.assessment.rationale,
            labels: p.item.labels.into_iter().collect(),
            assignees: p.item.assignees.into_iter().collect(),
            missing_details: p.assessment.missing_details,
        }
    }
}

fn triage_rows(
    plan: &ReleasePlan,
    context: &RepositoryContext,
    default_assignee: &str,
) -> Vec<TriageRow> {
    RunDriver::prepare(plan, context, default_assignee)
        .into_iter()
        .map(TriageRow::from)
        .collect()
}

fn render_triage_text(release: &str, rows: &[TriageRow]) -> String {
    let mut out = format!("Release: {}\n\n", release);
    for row in rows {
        out.push_str(&format!(
            "{}\n  type: {}  decision: {} ({}%)\n  labels: {}\n",
            row.title,
            row.work_type,
            row.decision,
            row.confidence,
            row.labels.join(", ")
        ));
        if !row.assignees.is_empty() {
            out.push_str(&format!("  assignees: {}\n", row.assignees.join(", ")));
        }
        if !row.missing_details.is_empty() {
            out.push_str(&format!("  missing: {}\n", row.missing_details.join(", ")));
        }
    }
    out.push_str(&format!("\n{} deliverable(s)\n", rows.len()));
    out
}

fn cmd_triage(
    plan_path: &Path,
    context_args: &ContextArgs,
    default_assignee: &str,
    format: OutputFormat,
) -> Result<()> {
    let plan = load_plan(plan_path)?;
    let context = load_context(context_args)?;
    let _span = RunSpan::enter("triage", &plan.name);

    let rows = triage_rows(&plan, &context, default_assignee);
    match format {
        OutputFormat::Text => print!("{}", render_triage_text(&plan.name, &rows)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

fn cmd_context(path: &Path) -> Result<()> {
    let context = probe_repository(path)
        .with_context(|| format!("Failed to probe repository at {:?}", path))?;
    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}

fn load_plan(path: &Path) -> Result<ReleasePlan> {
    ReleasePlan::from_path(path).with_context(|| format!("Failed to load release plan {:?}", path))
}

fn load_context(args: &ContextArgs) -> Result<RepositoryContext> {
    if let Some(snapshot) = &args.context {
        return RepositoryContext::from_json_path(snapshot)
            .with_context(|| format!("Failed to load context snapshot {:?}", snapshot));
    }
    if let Some(root) = &args.repo_path {
        return probe_repository(root)
            .with_context(|| format!("Failed to probe repository at {:?}", root));
    }
    warn!("No repository context given; deliverables touching data, auth or APIs will need clarification");
    Ok(RepositoryContext::new())
}

/// Assignee for dry runs, where the configuration is not validated.
fn dry_run_assignee(config: &SyncConfig) -> String {
    config
        .default_assignee
        .clone()
        .or_else(|| {
            config
                .repository
                .as_deref()
                .and_then(|r| r.split_once('/'))
                .map(|(owner, _)| owner.to_string())
        })
        .unwrap_or_default()
}
