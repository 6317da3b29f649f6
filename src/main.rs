//! `pgsync` — thin binary wrapper over the `pg_schema_sync` library.
//!
//! Loads the desired schema, connects to the primary (and, unless disabled,
//! a shadow) database, diffs against the live catalog, prints the plan's
//! step count / max lock mode / dangerous-or-lossy count, rehearses, and
//! applies. Per §1's Non-goals, this binary does not attempt full CLI
//! ergonomics (interactive confirmation prompts, `.env` loading, a TUI) —
//! those belong to an external collaborator.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgConnectOptions;

use pg_schema_sync::diagnostics::TextFormatter;
use pg_schema_sync::{config, desired_schema, differ, executor, introspect, parser, planner, CoreOutcome};

#[derive(Parser, Debug)]
#[command(name = "pgsync")]
#[command(about = "Declarative schema-control plane for PostgreSQL", long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "pgsync.toml")]
    config: PathBuf,

    /// Postgres connection string for the primary database.
    #[arg(long, env = "PGSYNC_DATABASE_URL")]
    database_url: String,

    /// Postgres connection string for the shadow rehearsal database.
    #[arg(long, env = "PGSYNC_SHADOW_DATABASE_URL")]
    shadow_database_url: Option<String>,

    /// Print the plan without applying it.
    #[arg(long)]
    plan_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let outcome = run(args).await?;
    std::process::exit(outcome.exit_code());
}

async fn run(args: Args) -> Result<CoreOutcome> {
    let config = if args.config.exists() {
        config::Config::from_file(&args.config).context("failed to load configuration")?
    } else {
        config::Config::default()
    };

    let source = desired_schema::load_source(&config.desired_schema.paths).context("failed to load desired schema")?;
    let outcome = parser::parse(&source);

    if outcome.has_errors() {
        let mut sources = BTreeMap::new();
        sources.insert("desired".to_string(), source);
        let annotated: Vec<(String, pg_schema_sync::Diagnostic)> =
            outcome.diagnostics.into_iter().map(|d| ("desired".to_string(), d)).collect();
        eprint!("{}", TextFormatter::format(&annotated, &sources));
        return Ok(CoreOutcome::ValidationOrParseError);
    }

    let desired = outcome.schema;

    let primary_options = PgConnectOptions::from_str(&args.database_url).context("invalid --database-url")?;
    let mut primary_conn = introspect::connect_and_ping(primary_options).await.context("failed to connect to primary database")?;

    let current = introspect::introspect(&mut primary_conn, &config.database.namespace)
        .await
        .context("failed to introspect primary database")?;

    let delta = differ::diff(&current, &desired);
    let plan = match planner::plan(&delta, &desired) {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("plan generation failed: {err}");
            return Ok(CoreOutcome::PlanGenerationFailed);
        }
    };

    println!(
        "plan: {} step(s), max lock mode {:?}, {} dangerous/lossy step(s)",
        plan.steps.len(),
        plan.max_lock_mode(),
        plan.dangerous_or_lossy_count(),
    );
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  [{i}] {} ({:?})", step.description, step.safety);
    }

    if args.plan_only {
        return Ok(CoreOutcome::Success);
    }

    let mut shadow_conn = match (&args.shadow_database_url, config.database.skip_rehearsal) {
        (Some(url), false) => {
            let options = PgConnectOptions::from_str(url).context("invalid --shadow-database-url")?;
            Some(introspect::connect_and_ping(options).await.context("failed to connect to shadow database")?)
        }
        (None, false) => {
            eprintln!("rehearsal is mandatory unless skip_rehearsal is set; pass --shadow-database-url");
            return Ok(CoreOutcome::RehearsalFailed);
        }
        (_, true) => None,
    };

    let options = executor::ExecuteOptions {
        skip_rehearsal: config.database.skip_rehearsal,
    };

    match executor::execute(&mut primary_conn, shadow_conn.as_mut(), &plan, &desired, options).await {
        Ok(_) => {
            println!("apply succeeded");
            Ok(CoreOutcome::Success)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(CoreOutcome::from(&err))
        }
    }
}
