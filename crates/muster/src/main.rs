//! muster - attendance compliance from badge scans
//!
//! Wires together:
//! - Policy file loading (settings and extra policies)
//! - The policy registry (built-ins plus file policies)
//! - Event batch loading
//! - Batch evaluation, printed as JSON on stdout

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use muster_api::EventBatch;
use muster_config::{Config, Settings, load_config, parse_date};
use muster_core::{BatchEvaluator, PolicyRegistry};
use muster_util::{MemberIdStyle, config_path_without_env};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// muster - attendance compliance from badge scans
#[derive(Parser, Debug)]
#[command(name = "muster")]
#[command(about = "Evaluate badge-scan attendance against named policies", long_about = None)]
struct Args {
    /// Policy file path (default: ~/.config/muster/policies.toml)
    #[arg(short, long, env = "MUSTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate an event batch under a policy
    Evaluate {
        /// Policy name
        #[arg(short, long)]
        policy: String,

        /// Event batch JSON file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        events: String,

        /// Only count sessions on these dates (YYYY-MM-DD, repeatable)
        #[arg(short, long = "day")]
        days: Vec<String>,

        /// Override the member id style ("text" or "numeric")
        #[arg(long)]
        id_style: Option<MemberIdStyle>,
    },

    /// List registered policies
    Policies,
}

#[derive(Debug, Serialize)]
struct PolicySummary {
    name: String,
    kind: String,
    description: String,
}

/// Load the policy file, if any.
///
/// A missing file at the default location is not an error: the run then
/// uses the built-in policies and default settings.
fn load_policies(path: Option<&Path>) -> Result<Option<Config>> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (config_path_without_env(), false),
    };

    if !explicit && !path.exists() {
        debug!(path = %path.display(), "No policy file, using built-ins");
        return Ok(None);
    }

    let config = load_config(&path)
        .with_context(|| format!("Failed to load policy file {}", path.display()))?;
    info!(
        path = %path.display(),
        policy_count = config.policies.len(),
        "Policy file loaded"
    );
    Ok(Some(config))
}

fn build_registry(config: Option<&Config>) -> Result<PolicyRegistry> {
    let include_builtin = config.is_none_or(|c| c.settings.include_builtin);

    let registry = if include_builtin {
        PolicyRegistry::with_builtins().context("Failed to register built-in policies")?
    } else {
        PolicyRegistry::new()
    };

    if let Some(config) = config {
        registry
            .load_config(config)
            .context("Failed to register policies from file")?;
    }
    Ok(registry)
}

fn read_events(source: &str) -> Result<EventBatch> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read events from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read events from {}", source))?
    };

    EventBatch::from_json(&content).context("Failed to parse event batch")
}

fn parse_days(days: &[String]) -> Result<Vec<NaiveDate>> {
    days.iter()
        .map(|d| parse_date(d).map_err(|e| anyhow!("Invalid --day: {}", e)))
        .collect()
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for JSON output
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    debug!(version = env!("CARGO_PKG_VERSION"), "muster starting");

    let config = load_policies(args.config.as_deref())?;
    let registry = build_registry(config.as_ref())?;

    match args.command {
        Command::Policies => {
            let summaries: Vec<PolicySummary> = registry
                .definitions()
                .iter()
                .map(|p| PolicySummary {
                    name: p.name.to_string(),
                    kind: p.kind().to_string(),
                    description: p.describe(),
                })
                .collect();
            print_json(&summaries)
        }
        Command::Evaluate {
            policy,
            events,
            days,
            id_style,
        } => {
            let settings = config.map(|c| c.settings).unwrap_or_default();
            let settings = Settings {
                member_id_style: id_style.unwrap_or(settings.member_id_style),
                ..settings
            };

            let (roster, source) = read_events(&events)?.into_parts();
            let mut batch = BatchEvaluator::from_settings(&registry, &settings);
            if !days.is_empty() {
                batch = batch.with_only_days(parse_days(&days)?);
            }

            let report = batch
                .run(&policy, &roster, &source)
                .with_context(|| format!("Failed to evaluate policy '{}'", policy))?;
            print_json(&report)
        }
    }
}
