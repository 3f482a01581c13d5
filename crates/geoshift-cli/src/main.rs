mod config;
mod registry;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{ConfigError, GeoshiftConfig, ResolvedEnvironment, load_config};
use geoshift_backend::{Backend, MemoryBackend, SnapshotError};
use geoshift_core::ValidationIssue;
use geoshift_migrate::{MigrationError, Migrator, Step, load_plan, plan_json_schema, refresh_reference};
use geoshift_rules::{RuleError, RuleGroup, RuleGroupReport, catalog_json_schema, load_catalog};
use registry::{RunContext, RunPaths, init_run_logging, start_run, write_report};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("workspace error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("rule error: {0}")]
    Rules(#[from] RuleError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "geoshift", version, about = "Geodatabase schema migration and attribute rules")]
struct Cli {
    /// Config file (defaults to ./geoshift.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Target environment.
    #[arg(long, global = true, value_name = "NAME")]
    env: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the schema migration.
    Migrate(MigrateArgs),
    /// Reload reference tables from their sources.
    Refresh,
    /// Reconcile or delete attribute rules.
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Validate the migration plan and rule catalog without touching a workspace.
    Validate,
    /// Print a JSON Schema.
    Schema {
        #[arg(value_enum)]
        kind: SchemaKind,
    },
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Migration plan (overrides the configured path).
    #[arg(long)]
    plan: Option<PathBuf>,
    /// Stop after this step.
    #[arg(long, value_name = "STEP")]
    stop_after: Option<Step>,
}

#[derive(Subcommand, Debug)]
enum RulesAction {
    /// Create or update every rule.
    Update(RulesArgs),
    /// Delete every rule.
    Delete(RulesArgs),
}

#[derive(Args, Debug)]
struct RulesArgs {
    /// Only this table.
    #[arg(long)]
    table: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemaKind {
    Plan,
    Rules,
}

/// How a completed command went.
enum Status {
    Success,
    Failures(usize),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(Status::Success) => ExitCode::SUCCESS,
        Ok(Status::Failures(count)) => {
            eprintln!("finished with {count} failure(s)");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<Status, CliError> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Schema { kind } => print_schema(kind),
        Command::Validate => run_validate(&config),
        Command::Migrate(args) => {
            let environment = config.environment(cli.env.as_deref())?;
            run_migrate(&config, &environment, args)
        }
        Command::Refresh => {
            let environment = config.environment(cli.env.as_deref())?;
            run_refresh(&config, &environment)
        }
        Command::Rules { action } => {
            let environment = config.environment(cli.env.as_deref())?;
            run_rules(&config, &environment, action)
        }
    }
}

fn print_schema(kind: SchemaKind) -> Result<Status, CliError> {
    let schema = match kind {
        SchemaKind::Plan => serde_json::to_string_pretty(&plan_json_schema())?,
        SchemaKind::Rules => serde_json::to_string_pretty(&catalog_json_schema())?,
    };
    println!("{schema}");
    Ok(Status::Success)
}

fn run_validate(config: &GeoshiftConfig) -> Result<Status, CliError> {
    let mut errors = 0;

    let plan_path = config.resolve(&config.paths.plan);
    match load_plan(&plan_path) {
        Ok(validated) => {
            println!("{}: ok", plan_path.display());
            print_issues("warning", &validated.warnings);
        }
        Err(MigrationError::InvalidPlan(report)) => {
            println!("{}: invalid", plan_path.display());
            print_issues("error", &report.errors);
            print_issues("warning", &report.warnings);
            errors += report.errors.len();
        }
        Err(err) => return Err(err.into()),
    }

    let rules_path = config.resolve(&config.paths.rules);
    match load_catalog(&rules_path) {
        Ok(loaded) => {
            println!("{}: ok ({} tables)", rules_path.display(), loaded.registry.len());
            print_issues("warning", &loaded.warnings);
        }
        Err(RuleError::Invalid(report)) => {
            println!("{}: invalid", rules_path.display());
            print_issues("error", &report.errors);
            print_issues("warning", &report.warnings);
            errors += report.errors.len();
        }
        Err(err) => return Err(err.into()),
    }

    Ok(if errors == 0 {
        Status::Success
    } else {
        Status::Failures(errors)
    })
}

fn print_issues(label: &str, issues: &[ValidationIssue]) {
    for issue in issues {
        println!("  {label}: {issue}");
    }
}

/// Open run artifacts and logging, then the environment's workspace.
fn begin_run(
    config: &GeoshiftConfig,
    environment: &ResolvedEnvironment,
    command: &str,
) -> Result<(RunPaths, MemoryBackend), CliError> {
    let run_id = Uuid::new_v4().to_string();
    let ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: command.to_string(),
        environment: environment.name.clone(),
        workspace: environment.workspace.clone(),
        run_dir: config.resolve(&config.run_dir),
    };
    let paths = start_run(&ctx)?;
    init_run_logging(&paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        command,
        environment = %environment.name,
        workspace = %environment.workspace.display()
    );

    let backend = MemoryBackend::open(&environment.workspace)?;
    Ok((paths, backend))
}

fn finish_run<T: Serialize>(
    paths: &RunPaths,
    report: &T,
    failures: usize,
    timer: Instant,
) -> Result<Status, CliError> {
    write_report(paths, report)?;
    let status = if failures == 0 { "success" } else { "completed_with_failures" };
    tracing::info!(
        event = "run_finished",
        status,
        failures,
        duration_ms = timer.elapsed().as_millis() as u64,
        report = %paths.report_path.display()
    );
    Ok(if failures == 0 {
        Status::Success
    } else {
        Status::Failures(failures)
    })
}

fn run_migrate(
    config: &GeoshiftConfig,
    environment: &ResolvedEnvironment,
    args: MigrateArgs,
) -> Result<Status, CliError> {
    let plan_path = args
        .plan
        .unwrap_or_else(|| config.resolve(&config.paths.plan));
    let validated = load_plan(&plan_path)?;

    let timer = Instant::now();
    let (paths, mut backend) = begin_run(config, environment, "migrate")?;
    for warning in &validated.warnings {
        tracing::warn!(code = %warning.code, path = %warning.path, "{}", warning.message);
    }

    let outcome = Migrator::new(&validated.plan)
        .stop_after(args.stop_after)
        .run(&mut backend);
    match outcome {
        Ok(report) => {
            backend.save(&environment.workspace)?;
            finish_run(&paths, &report, report.failure_count(), timer)
        }
        Err(MigrationError::Aborted { step, report }) => {
            backend.save(&environment.workspace)?;
            write_report(&paths, &report)?;
            tracing::error!(event = "run_finished", status = "aborted", step = %step);
            Err(MigrationError::Aborted { step, report }.into())
        }
        Err(err) => {
            tracing::error!(event = "run_finished", status = "failed", error = %err);
            Err(err.into())
        }
    }
}

fn run_refresh(
    config: &GeoshiftConfig,
    environment: &ResolvedEnvironment,
) -> Result<Status, CliError> {
    if config.reference.is_empty() {
        return Err(CliError::InvalidConfig(
            "no [[reference]] tables configured".to_string(),
        ));
    }

    let timer = Instant::now();
    let (paths, mut backend) = begin_run(config, environment, "refresh")?;
    let report = match refresh_reference(&mut backend, &config.reference) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(event = "run_finished", status = "failed", error = %err);
            return Err(err.into());
        }
    };
    backend.save(&environment.workspace)?;
    finish_run(&paths, &report, report.failure_count(), timer)
}

#[derive(Debug, Serialize)]
struct RulesReport {
    action: &'static str,
    groups: Vec<RuleGroupReport>,
    failures: Vec<RuleFailure>,
}

#[derive(Debug, Serialize)]
struct RuleFailure {
    table: String,
    error: String,
}

fn run_rules(
    config: &GeoshiftConfig,
    environment: &ResolvedEnvironment,
    action: RulesAction,
) -> Result<Status, CliError> {
    let (verb, args) = match &action {
        RulesAction::Update(args) => ("update", args),
        RulesAction::Delete(args) => ("delete", args),
    };
    let loaded = load_catalog(&config.resolve(&config.paths.rules))?;
    let sets: Vec<_> = match &args.table {
        Some(table) => vec![loaded.registry.get(table).ok_or_else(|| {
            CliError::InvalidConfig(format!("no rules are declared for table '{table}'"))
        })?],
        None => loaded.registry.iter().collect(),
    };

    let timer = Instant::now();
    let (paths, mut backend) = begin_run(config, environment, &format!("rules {verb}"))?;
    for warning in &loaded.warnings {
        tracing::warn!(code = %warning.code, path = %warning.path, "{}", warning.message);
    }

    let mut report = RulesReport {
        action: verb,
        groups: Vec::new(),
        failures: Vec::new(),
    };
    for set in sets {
        let group = RuleGroup::new(backend.workspace(), set.table.clone(), &set.rules);
        let outcome = match action {
            RulesAction::Update(_) => group.reconcile(&mut backend),
            RulesAction::Delete(_) => group.delete(&mut backend),
        };
        match outcome {
            Ok(group_report) => report.groups.push(group_report),
            Err(err) => {
                tracing::error!(table = %set.table, error = %err, "rule group failed");
                report.failures.push(RuleFailure {
                    table: set.table.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    backend.save(&environment.workspace)?;
    let failures = report.failures.len();
    finish_run(&paths, &report, failures, timer)
}
