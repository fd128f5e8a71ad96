//! Keystone - CDP core deployment inspector
//!
//! Usage:
//!   keystone plan botanix-testnet              # What the next run would do
//!   keystone status botanix-testnet            # Recorded deployment
//!   keystone status botanix-testnet --balance  # ... plus the deployer balance

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keystone_core::chain::JsonRpcClient;
use keystone_core::config::ConfigStore;
use keystone_core::plan::{DeploymentPlan, ResourcePlanAction, UnitPlanAction, plan};
use keystone_core::state::StateStore;
use keystone_core::status::{StatusReport, UnitState, collect_status};
use keystone_core::target::DeploymentTarget;

#[derive(Parser)]
#[command(name = "keystone")]
#[command(about = "CDP core deployment inspector", long_about = None)]
struct Cli {
    /// Directory holding one <target>.toml per deployment target
    #[arg(long, global = true, default_value = "deployment")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what the next run would construct, attach and configure
    Plan {
        /// Deployment target (e.g. localhost, mainnet, botanix-testnet)
        target: DeploymentTarget,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the recorded deployment of a target
    Status {
        /// Deployment target (e.g. localhost, mainnet, botanix-testnet)
        target: DeploymentTarget,

        /// Query the deployer balance through the configured rpc_url
        #[arg(long)]
        balance: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keystone=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let store = ConfigStore::new(cli.config_dir);

    match cli.command {
        Commands::Plan { target, format } => run_plan(&store, target, format),
        Commands::Status {
            target,
            balance,
            format,
        } => run_status(&store, target, balance, format).await,
    }
}

fn run_plan(store: &ConfigStore, target: DeploymentTarget, format: OutputFormat) -> Result<()> {
    let config = store.load(target)?;
    let state = StateStore::new(&config.output_file).load()?;
    tracing::debug!(%target, records = state.len(), file = %config.output_file.display(), "Loaded deployment state");
    let plan = plan(&config, &state);

    match format {
        OutputFormat::Table => print_plan_table(&plan),
        OutputFormat::Json => print_plan_json(&plan)?,
    }
    Ok(())
}

async fn run_status(
    store: &ConfigStore,
    target: DeploymentTarget,
    balance: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = store.load(target)?;
    let state = StateStore::new(&config.output_file).load()?;
    tracing::debug!(%target, records = state.len(), file = %config.output_file.display(), "Loaded deployment state");
    let mut report = collect_status(&config, &state);

    if balance {
        let url = config
            .rpc_url
            .clone()
            .with_context(|| format!("No rpc_url configured for {target}"))?;
        let client = JsonRpcClient::new(url);
        report
            .fetch_balance(&client)
            .await
            .context("Failed to query deployer balance")?;
    }

    match format {
        OutputFormat::Table => print_status_table(&report),
        OutputFormat::Json => print_status_json(&report)?,
    }
    Ok(())
}

// =============================================================================
// Plan output
// =============================================================================

fn print_plan_table(plan: &DeploymentPlan) {
    println!("Target: {}", style(plan.target).bold());
    println!("State file: {}", plan.state_file.display());
    println!();

    println!("Units ({}):", plan.units.len());
    println!(
        "  {:<24} {:<8} {:<18} {:<44} Verified",
        "Unit", "Proxy", "Action", "Address"
    );
    println!("  {}", "-".repeat(104));
    for unit in &plan.units {
        let (action, address) = match &unit.action {
            UnitPlanAction::AttachRecorded { address } => {
                ("attach", address.to_string())
            }
            UnitPlanAction::AttachConfigured { address } => {
                ("attach (config)", address.to_string())
            }
            UnitPlanAction::Construct => ("construct", "-".to_string()),
        };
        println!(
            "  {:<24} {:<8} {:<18} {:<44} {}",
            truncate(&unit.unit, 24),
            if unit.upgradeable { "yes" } else { "no" },
            action,
            address,
            if unit.verification.is_some() { "yes" } else { "-" }
        );
    }
    println!();

    if !plan.resources.is_empty() {
        println!("Collateral ({}):", plan.resources.len());
        for item in &plan.resources {
            match &item.action {
                ResourcePlanAction::Configure { native_oracle } => {
                    let suffix = if *native_oracle { " (+ native oracle)" } else { "" };
                    println!("  {} {}{}", style("[configure]").green(), item.name, suffix);
                }
                ResourcePlanAction::Skip { reason } => {
                    println!("  {} {}: {}", style("[skip]").yellow(), item.name, reason);
                }
            }
        }
        println!();
    }

    let mut finalize = Vec::new();
    if plan.finalize.initialize_setup {
        finalize.push("initialize setup");
    }
    if plan.finalize.verify {
        finalize.push("verify");
    }
    if plan.finalize.transfer_ownership {
        finalize.push("transfer ownership");
    }
    if finalize.is_empty() {
        println!("Finalize: none");
    } else {
        println!("Finalize: {}", finalize.join(", "));
    }

    let pending = plan.pending_constructions();
    if pending > 0 {
        println!("Summary: {} units to construct", pending);
    } else {
        println!("Summary: every unit is deployed");
    }
}

fn print_plan_json(plan: &DeploymentPlan) -> Result<()> {
    // Wrap in versioned output
    let output = serde_json::json!({
        "schema_version": 1,
        "target": plan.target,
        "state_file": plan.state_file,
        "units": plan.units,
        "resources": plan.resources,
        "finalize": plan.finalize,
        "pending_constructions": plan.pending_constructions(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// =============================================================================
// Status output
// =============================================================================

fn print_status_table(report: &StatusReport) {
    println!("Target: {}", style(report.target).bold());
    println!("State file: {}", report.state_file.display());
    match report.deployer_balance {
        Some(balance) => println!(
            "Deployer: {} ({} ETH)",
            report.deployer,
            balance.format_ether()
        ),
        None => println!("Deployer: {}", report.deployer),
    }
    println!();

    println!(
        "  {:<24} {:<44} {:<20} Status",
        "Unit", "Address", "Deployed"
    );
    println!("  {}", "-".repeat(100));
    for unit in &report.units {
        let address = unit
            .address
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let deployed = unit
            .deployed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:<44} {:<20} {}",
            truncate(&unit.unit, 24),
            address,
            deployed,
            state_symbol(unit.state, unit.verification.is_some())
        );
    }

    if !report.orphaned.is_empty() {
        println!();
        println!("Unknown records: {}", report.orphaned.join(", "));
    }

    println!();
    let summary = &report.summary;
    if summary.missing > 0 {
        println!(
            "Summary: {}/{} deployed, {} verified, {} missing",
            summary.deployed, summary.total, summary.verified, summary.missing
        );
    } else {
        println!(
            "Summary: {}/{} deployed, {} verified",
            summary.deployed, summary.total, summary.verified
        );
    }
}

fn print_status_json(report: &StatusReport) -> Result<()> {
    // Wrap in versioned output
    let output = serde_json::json!({
        "schema_version": 1,
        "target": report.target,
        "state_file": report.state_file,
        "deployer": report.deployer,
        "deployer_balance": report.deployer_balance,
        "units": report.units,
        "orphaned": report.orphaned,
        "summary": report.summary,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn state_symbol(state: UnitState, verified: bool) -> String {
    match (state, verified) {
        (UnitState::Deployed, true) => style("[Verified]").green().to_string(),
        (UnitState::Deployed, false) => style("[Deployed]").green().to_string(),
        (UnitState::External, _) => style("[External]").cyan().to_string(),
        (UnitState::Missing, _) => style("[Missing]").yellow().to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
